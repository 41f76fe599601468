//! Broadcast channel carrying [`FlowEvent`]s to any number of observers.

use flow_types::FlowEvent;
use tokio::sync::broadcast;

/// Cloneable handle to the flow's event channel.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<FlowEvent>,
}

impl EventBus {
	/// Creates a bus that buffers up to `capacity` events per slow subscriber.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity.max(1));
		Self { sender }
	}

	/// Publishes an event to every current subscriber.
	///
	/// Fails only when nobody is subscribed; callers usually ignore that.
	pub fn publish(
		&self,
		event: FlowEvent,
	) -> Result<usize, broadcast::error::SendError<FlowEvent>> {
		self.sender.send(event)
	}

	pub fn subscribe(&self) -> broadcast::Receiver<FlowEvent> {
		self.sender.subscribe()
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(1000)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_publish_reaches_all_subscribers() {
		let bus = EventBus::new(16);
		assert!(bus.publish(FlowEvent::CursorChanged { index: 0 }).is_err());

		let mut first = bus.subscribe();
		let mut second = bus.clone().subscribe();
		assert_eq!(
			bus.publish(FlowEvent::CursorChanged { index: 1 }).unwrap(),
			2
		);

		assert_eq!(
			first.recv().await.unwrap(),
			FlowEvent::CursorChanged { index: 1 }
		);
		assert_eq!(
			second.recv().await.unwrap(),
			FlowEvent::CursorChanged { index: 1 }
		);
	}
}
