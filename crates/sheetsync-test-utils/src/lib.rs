//! Testing utilities for Sheetsync workspace
//!
//! Shared fixtures: a `partner` model with five records, its `user` and
//! `tag` relations.

#![allow(missing_docs)]

use serde_json::json;
use sheetsync_model::{FieldDef, FieldType, ListDefinition, OrderBy, PivotDefinition};
use sheetsync_orm::{Fixture, InMemoryOrm, ModelFixture};
use std::sync::Arc;

pub const PARTNER: &str = "partner";
pub const USER: &str = "user";
pub const TAG: &str = "tag";

pub fn partner_model() -> ModelFixture {
    ModelFixture::new("Partner")
        .with_field("name", FieldDef::new(FieldType::Char, "Name"))
        .with_field(
            "owner_id",
            FieldDef::relational(FieldType::Many2one, "Owner", USER),
        )
        .with_field(
            "tag_ids",
            FieldDef::relational(FieldType::Many2many, "Tags", TAG),
        )
        .with_field(
            "priority",
            FieldDef::selection("Priority", [("1", "Low"), ("2", "Medium")]),
        )
        .with_field("active", FieldDef::new(FieldType::Boolean, "Active"))
        .with_field("amount", FieldDef::new(FieldType::Float, "Amount"))
        .with_field("notes", FieldDef::new(FieldType::Text, "Notes"))
        .with_record(json!({
            "id": 1, "name": "Alpha", "owner_id": [3, "De Bruyne"], "tag_ids": [1, 2],
            "priority": "2", "active": true, "amount": 10, "notes": "first"
        }))
        .with_record(json!({
            "id": 2, "name": "Bravo", "owner_id": false, "tag_ids": [],
            "priority": "1", "active": false, "amount": 5, "notes": false
        }))
        .with_record(json!({
            "id": 3, "name": "Charlie", "owner_id": [7, "Kevin"], "tag_ids": [2],
            "priority": false, "active": true, "amount": 1, "notes": "third"
        }))
        .with_record(json!({
            "id": 4, "name": "Delta", "owner_id": [3, "De Bruyne"], "tag_ids": [1],
            "priority": "3", "active": true, "amount": 20, "notes": false
        }))
        .with_record(json!({
            "id": 5, "name": "Echo", "owner_id": [7, "Kevin"], "tag_ids": [],
            "priority": "2", "active": false, "amount": 3, "notes": "fifth"
        }))
}

pub fn user_model() -> ModelFixture {
    ModelFixture::new("User")
        .with_field("name", FieldDef::new(FieldType::Char, "Name"))
        .with_record(json!({ "id": 3, "name": "De Bruyne" }))
        .with_record(json!({ "id": 7, "name": "Kevin" }))
}

pub fn tag_model() -> ModelFixture {
    ModelFixture::new("Tag")
        .with_field("name", FieldDef::new(FieldType::Char, "Name"))
        .with_record(json!({ "id": 1, "name": "Blue" }))
        .with_record(json!({ "id": 2, "name": "Red" }))
}

/// Partner, user and tag models
pub fn partner_fixture() -> Fixture {
    Fixture::new()
        .with_model(PARTNER, partner_model())
        .with_model(USER, user_model())
        .with_model(TAG, tag_model())
}

pub fn partner_orm() -> Arc<InMemoryOrm> {
    Arc::new(InMemoryOrm::new(partner_fixture()))
}

/// List over partners sorted by id
pub fn partner_list<I, S>(columns: I) -> ListDefinition
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    ListDefinition::new(PARTNER, columns).with_order_by(vec![OrderBy::asc("id")])
}

/// Pivot of partner amounts by owner and priority
pub fn partner_pivot() -> PivotDefinition {
    PivotDefinition::new(PARTNER, ["amount"])
        .with_rows(["owner_id"])
        .with_cols(["priority"])
}
