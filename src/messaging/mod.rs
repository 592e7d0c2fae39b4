// Messaging module
// Notifications and clicks crossing thread boundaries

pub mod channels;
pub mod notification;

pub use channels::{
    ClickConsumer, ClickProducer, NotificationConsumer, NotificationProducer,
    create_click_channel, create_notification_channel,
};
pub use notification::{Notification, NotificationCategory, NotificationLevel};
