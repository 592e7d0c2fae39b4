// Lock-free channels between the capture threads, the audio callback and the UI

use crate::messaging::notification::Notification;
use crate::sequencer::metronome::ClickNote;
use ringbuf::{HeapRb, traits::Split};

pub type NotificationProducer = ringbuf::HeapProd<Notification>;
pub type NotificationConsumer = ringbuf::HeapCons<Notification>;

pub fn create_notification_channel(
    capacity: usize,
) -> (NotificationProducer, NotificationConsumer) {
    let rb = HeapRb::<Notification>::new(capacity);
    rb.split()
}

pub type ClickProducer = ringbuf::HeapProd<ClickNote>;
pub type ClickConsumer = ringbuf::HeapCons<ClickNote>;

pub fn create_click_channel(capacity: usize) -> (ClickProducer, ClickConsumer) {
    let rb = HeapRb::<ClickNote>::new(capacity);
    rb.split()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::notification::NotificationCategory;
    use ringbuf::traits::{Consumer, Producer};

    #[test]
    fn test_notification_channel_order_and_capacity() {
        let (mut tx, mut rx) = create_notification_channel(2);
        let notice = |m: &str| Notification::info(NotificationCategory::Capture, m);

        assert!(tx.try_push(notice("a")).is_ok());
        assert!(tx.try_push(notice("b")).is_ok());
        assert!(tx.try_push(notice("c")).is_err());

        assert_eq!(rx.try_pop().map(|n| n.message), Some("a".to_string()));
        assert_eq!(rx.try_pop().map(|n| n.message), Some("b".to_string()));
        assert!(rx.try_pop().is_none());
    }
}
