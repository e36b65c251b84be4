//! Command and record builders for integration tests

use cmdgate_core::models::{Command, CommandKind, Record, RecordKey};
use cmdgate_core::persistence::InMemoryGateway;
use serde_json::{json, Value};
use uuid::Uuid;

/// Fresh idempotency key with a readable prefix
pub fn unique_key(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

pub fn register_account(key: &str, username: &str) -> Command {
    Command::from_json(
        CommandKind::RegisterAccount,
        key,
        json!({
            "username": username,
            "password": "correct-horse-battery",
            "email": format!("{username}@example.com"),
        }),
    )
}

pub fn insert_tag(key: &str, name: &str) -> Command {
    Command::from_json(
        CommandKind::InsertTag,
        key,
        json!({ "name": name, "description": "seaside venues" }),
    )
}

pub fn insert_banner(key: &str, rest_point_id: &str) -> Command {
    Command::from_json(
        CommandKind::InsertBanner,
        key,
        json!({
            "restPointId": rest_point_id,
            "imageData": [137, 80, 78, 71],
            "imageType": "image/png",
        }),
    )
}

pub fn delete_address(key: &str, address_id: &str) -> Command {
    Command::from_json(
        CommandKind::DeleteAddress,
        key,
        json!({ "addressId": address_id }),
    )
}

pub fn record_justification(key: &str, student_id: &str, date: &str) -> Command {
    Command::from_json(
        CommandKind::RecordJustification,
        key,
        json!({ "studentId": student_id, "absenceDate": date, "reason": "Medical visit" }),
    )
}

/// Seeds records straight into the backend, bypassing faults
pub struct Seeder<'a> {
    backend: &'a InMemoryGateway,
}

impl<'a> Seeder<'a> {
    pub fn new(backend: &'a InMemoryGateway) -> Self {
        Self { backend }
    }

    pub fn record(&self, collection: &str, id: &str, data: Value) -> &Self {
        self.backend.seed(Record::new(RecordKey::new(collection, id), data));
        self
    }

    pub fn rest_point(&self, id: &str, max_banners: u64, existing_banners: usize) -> &Self {
        self.record("rest_points", id, json!({ "name": "Sunset Cafe", "maxBanners": max_banners }));
        for index in 0..existing_banners {
            self.record(
                "banners",
                &format!("{id}-banner-{index}"),
                json!({ "restPointId": id, "imageType": "image/png" }),
            );
        }
        self
    }

    pub fn address(&self, id: &str, owner: &str) -> &Self {
        self.record("addresses", id, json!({ "ownerId": owner, "street": "Via Roma 1" }))
    }

    pub fn absence(&self, student_id: &str, date: &str) -> &Self {
        self.record(
            "absences",
            &format!("{student_id}:{date}"),
            json!({ "studentId": student_id, "absenceDate": date, "justified": false }),
        )
    }
}
