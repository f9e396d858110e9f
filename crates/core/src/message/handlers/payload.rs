use async_trait::async_trait;

use crate::callback::Delivery;
use crate::error::Result;
use crate::measure::Measure;
use crate::measure::MeasureCounter;
use crate::message::Envelope;
use crate::message::HandleMsg;
use crate::message::MessageHandlerEvent;
use crate::message::Payload;
use crate::node::Node;

#[async_trait]
impl HandleMsg<Payload> for Node {
    async fn handle(&self, ctx: &Envelope, msg: &Payload) -> Result<Vec<MessageHandlerEvent>> {
        let hops = ctx.from.hop_count;
        self.ctx.measure.incr(MeasureCounter::Delivered);
        self.ctx.measure.add(MeasureCounter::Hops, hops as u64);

        let delivery = Delivery {
            origin: ctx.from.target,
            destination: self.id(),
            hops,
            path: ctx.relay.path_to(self.id()),
            data: msg.data.clone(),
        };
        tracing::debug!(
            "[message] {} got {} bytes from {} in {} hops",
            self.id(),
            msg.data.len(),
            delivery.origin,
            hops
        );
        if let Some(cb) = self.ctx.callback()? {
            if let Err(e) = cb.on_delivered(&delivery).await {
                tracing::error!("Callback on_delivered failed: {:?}", e);
            }
        }
        Ok(vec![])
    }
}
