//! Matrix push gateway payload.
//!
//! Only `devices[].pushkey` is typed. Every other field is passed through as
//! raw JSON: the gateway never reads it and the forwarded body is the
//! inbound bytes anyway, so a homeserver sending `null` or a float somewhere
//! must not get its push refused.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level body of a `/_matrix/push/v1/notify` call.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatrixPushNotification {
    pub notification: Notification,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Notification {
    pub content: Value,
    pub counts: Value,
    pub devices: Vec<Device>,
    pub event_id: Value,
    pub room_id: Value,
    pub room_alias: Value,
    pub room_name: Value,
    pub sender: Value,
    pub sender_display_name: Value,
    pub prio: Value,
    #[serde(rename = "type")]
    pub event_type: Value,
}

/// A device the notification should be delivered to.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Device {
    pub app_id: Value,
    pub data: Value,
    /// Delivery URL. For UnifiedPush this is the endpoint on the push server.
    pub pushkey: String,
    pub pushkey_ts: Value,
    pub tweaks: Value,
}

impl MatrixPushNotification {
    /// The device whose pushkey decides where the payload goes.
    ///
    /// Only the first entry is considered; further devices are ignored.
    pub fn primary_device(&self) -> Option<&Device> {
        self.notification.devices.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_notification() {
        let body = r#"{"notification":{"content":{"body":"hi","msgtype":"m.text"},"counts":{"unread":2},"devices":[{"app_id":"org.example","data":{},"pushkey":"https://push.example.com/up1","pushkey_ts":12,"tweaks":{"sound":"bing"}}],"prio":"high","type":"m.room.message"}}"#;
        let parsed: MatrixPushNotification = serde_json::from_str(body).unwrap();

        let device = parsed.primary_device().unwrap();
        assert_eq!(device.pushkey, "https://push.example.com/up1");
        assert_eq!(device.pushkey_ts, 12);
        assert_eq!(device.tweaks["sound"], "bing");
        assert_eq!(parsed.notification.event_type, "m.room.message");
        assert_eq!(parsed.notification.counts["unread"], 2);
    }

    #[test]
    fn opaque_fields_accept_any_json() {
        let body = r#"{"notification":{"counts":{"unread":-1},"devices":[{"app_id":null,"data":[1,2],"pushkey":"https://push.example.com/up1","pushkey_ts":1.5,"tweaks":null}],"prio":7}}"#;
        let parsed: MatrixPushNotification = serde_json::from_str(body).unwrap();

        let device = parsed.primary_device().unwrap();
        assert_eq!(device.pushkey, "https://push.example.com/up1");
        assert!(device.app_id.is_null());
        assert!(device.tweaks.is_null());
        assert_eq!(device.pushkey_ts, 1.5);
    }

    #[test]
    fn missing_notification_is_an_error() {
        let result = serde_json::from_str::<MatrixPushNotification>(r#"{"message":"hello"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn non_string_pushkey_is_an_error() {
        let result = serde_json::from_str::<MatrixPushNotification>(
            r#"{"notification":{"devices":[{"pushkey":42}]}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn first_device_wins() {
        let body = r#"{"notification":{"devices":[{"pushkey":"https://a"},{"pushkey":"https://b"}]}}"#;
        let parsed: MatrixPushNotification = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.primary_device().unwrap().pushkey, "https://a");
    }
}
