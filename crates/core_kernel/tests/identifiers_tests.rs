//! Tests for strongly typed identifiers

use core_kernel::{AccountId, InvoiceId, PaymentId, ScheduledPaymentId, SubscriptionId};
use uuid::Uuid;

mod payment_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        assert_ne!(PaymentId::new(), PaymentId::new());
    }

    #[test]
    fn test_v7_ids_are_time_ordered() {
        let first = PaymentId::new_v7();
        let second = PaymentId::new_v7();
        assert!(first <= second);
    }

    #[test]
    fn test_prefix() {
        assert_eq!(PaymentId::prefix(), "PAY");
    }

    #[test]
    fn test_json_serialization_is_transparent() {
        let id = PaymentId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
        let back: PaymentId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}

mod parsing {
    use super::*;

    #[test]
    fn test_subscription_id_roundtrip() {
        let original = SubscriptionId::new();
        let parsed: SubscriptionId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_bare_uuid_is_accepted() {
        let uuid = Uuid::new_v4();
        let parsed: ScheduledPaymentId = uuid.to_string().parse().unwrap();
        assert_eq!(*parsed.as_uuid(), uuid);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!("SUB-not-a-uuid".parse::<SubscriptionId>().is_err());
    }
}

mod ordering {
    use super::*;

    #[test]
    fn test_invoice_ids_sort_by_uuid() {
        let a = InvoiceId::from_uuid(Uuid::from_u128(1));
        let b = InvoiceId::from_uuid(Uuid::from_u128(2));
        let mut ids = vec![b, a];
        ids.sort();
        assert_eq!(ids, vec![a, b]);
    }

    #[test]
    fn test_display_prefixes_differ_per_type() {
        let uuid = Uuid::new_v4();
        assert!(AccountId::from(uuid).to_string().starts_with("ACC-"));
        assert!(InvoiceId::from(uuid).to_string().starts_with("INV-"));
    }
}
