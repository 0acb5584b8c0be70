//! 공통 모델 테스트

use shared::{
    BridgeEvent, DeviceRecord, DisconnectReason, DomainEvent, PinDataType, PinKind, PinState,
};

#[cfg(test)]
mod pin_tests {
    use super::*;

    #[test]
    fn test_data_type_inference() {
        assert_eq!(PinDataType::infer("true"), PinDataType::Boolean);
        assert_eq!(PinDataType::infer("FALSE"), PinDataType::Boolean);
        assert_eq!(PinDataType::infer("-42"), PinDataType::Integer);
        assert_eq!(PinDataType::infer("3.14"), PinDataType::Float);
        assert_eq!(PinDataType::infer("NaN"), PinDataType::String);
        assert_eq!(PinDataType::infer("on"), PinDataType::String);
        assert_eq!(PinDataType::infer(""), PinDataType::String);
    }

    #[test]
    fn test_pin_state_json() {
        let state = PinState::new(5, "100", 1_700_000_000_000);
        let value = serde_json::to_value(&state).expect("Safe unwrap");
        assert_eq!(value["pinNumber"], 5);
        assert_eq!(value["dataType"], "INTEGER");
        assert_eq!(value["lastUpdatedEpoch"], 1_700_000_000_000i64);
    }
}

#[cfg(test)]
mod event_tests {
    use super::*;

    #[test]
    fn test_event_names_and_device_id() {
        let pin = DomainEvent::PinUpdated {
            device_id: "d1".into(),
            kind: PinKind::Digital,
            pin: 13,
            value: "1".into(),
            data_type: PinDataType::Integer,
        };
        assert_eq!(pin.name(), "digital_pin_update");
        assert_eq!(pin.device_id(), "d1");

        let bridged = BridgeEvent {
            event: DomainEvent::DeviceDisconnected {
                device_id: "d2".into(),
                reason: DisconnectReason::Replaced,
            },
            timestamp: 1,
        };
        assert_eq!(bridged.device_id(), "d2");
        assert_eq!(bridged.event.name(), "device_disconnected");
    }

    #[test]
    fn test_device_record_accepts_id_alias() {
        let record: DeviceRecord =
            serde_json::from_str(r#"{"id":"dev-9","token":"abc"}"#).expect("Safe unwrap");
        assert_eq!(record.device_id, "dev-9");
        assert!(record.name.is_none());
    }
}
