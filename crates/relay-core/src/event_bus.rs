//! Event bus for settlement notifications.
//!
//! Components publish a `SettlementEvent` after every successful state change.
//! Any number of subscribers can follow the stream; a subscriber that falls
//! more than `capacity` events behind loses the oldest ones.

use relay_types::SettlementEvent;
use tokio::sync::broadcast;

/// Broadcast bus shared by the channel ledger and the executor.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<SettlementEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes an event, returning how many subscribers received it.
	///
	/// Fails only when nobody is subscribed; callers ignore that case.
	pub fn publish(
		&self,
		event: SettlementEvent,
	) -> Result<usize, broadcast::error::SendError<SettlementEvent>> {
		self.sender.send(event)
	}

	pub fn subscribe(&self) -> broadcast::Receiver<SettlementEvent> {
		self.sender.subscribe()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use relay_types::{Address, U256};

	#[tokio::test]
	async fn test_publish_reaches_every_subscriber() {
		let bus = EventBus::new(8);
		let mut first = bus.subscribe();
		let mut second = bus.subscribe();

		let event = SettlementEvent::OperatorAuthorized {
			owner: Address::repeat_byte(1),
			operator: Address::repeat_byte(2),
			nonce: U256::ZERO,
		};
		assert_eq!(bus.publish(event.clone()).unwrap(), 2);
		assert_eq!(first.recv().await.unwrap(), event);
		assert_eq!(second.recv().await.unwrap(), event);
	}

	#[tokio::test]
	async fn test_events_serialize_for_indexers() {
		let bus = EventBus::new(8);
		let mut receiver = bus.subscribe();
		bus.publish(SettlementEvent::ChannelWithdrawn {
			channel_id: relay_types::ChannelId::right_padded(&[0x01]).unwrap(),
			beneficiary: Address::repeat_byte(1),
			payer: Address::repeat_byte(2),
			amount: U256::from(5),
			cumulative_withdrawn: U256::from(6),
			caller: Address::repeat_byte(3),
		})
		.unwrap();

		let json = serde_json::to_value(receiver.recv().await.unwrap()).unwrap();
		assert_eq!(json["event"], "channel_withdrawn");
		assert_eq!(json["amount"], "0x5");
	}

	#[test]
	fn test_publish_without_subscribers() {
		let bus = EventBus::new(8);
		let event = SettlementEvent::OperatorRevoked {
			owner: Address::repeat_byte(1),
			operator: Address::repeat_byte(2),
			nonce: U256::from(1),
		};
		assert!(bus.publish(event).is_err());
	}
}
