//! Demo accounts and seed rows for the in-memory backend.

use serde::Serialize;
use serde_json::{json, Value};

use crate::models::Role;

use super::{memory::InMemoryStore, Table};

/// Shared password of every demo login
pub const DEMO_PASSWORD: &str = "hashed_pw";

/// A login offered on the sign-in form for quick access
#[derive(Debug, Clone, Serialize)]
pub struct DemoAccount {
    pub email: &'static str,
    pub password: &'static str,
    pub role: Role,
}

pub const DEMO_ACCOUNTS: [DemoAccount; 4] = [
    DemoAccount {
        email: "sysadmin1@defensehq.mil",
        password: DEMO_PASSWORD,
        role: Role::SystemAdmin,
    },
    DemoAccount {
        email: "e.johansen@baseironclad.mil",
        password: DEMO_PASSWORD,
        role: Role::BaseCommander,
    },
    DemoAccount {
        email: "l.park@campsentinel.mil",
        password: DEMO_PASSWORD,
        role: Role::MilitaryPersonnel,
    },
    DemoAccount {
        email: "o.saleh@outpostfalcon.mil",
        password: DEMO_PASSWORD,
        role: Role::LogisticsOfficer,
    },
];

fn bases() -> Vec<Value> {
    vec![
        json!({ "id": 1, "code": "HQ", "name": "Defense HQ", "location": "Capital District" }),
        json!({ "id": 2, "code": "IRC", "name": "Base Ironclad", "location": "Northern Ridge" }),
        json!({ "id": 3, "code": "SEN", "name": "Camp Sentinel", "location": "Coastal Sector" }),
        json!({ "id": 4, "code": "FAL", "name": "Outpost Falcon", "location": "Eastern Desert" }),
    ]
}

fn users() -> Vec<Value> {
    vec![
        json!({
            "service_id": "SA-0001", "name": "R. Hale", "email": "sysadmin1@defensehq.mil",
            "role": "System Admin", "base_id": 1
        }),
        json!({
            "service_id": "BC-0107", "name": "E. Johansen", "email": "e.johansen@baseironclad.mil",
            "role": "Base Commander", "base_id": 2
        }),
        json!({
            "service_id": "MP-0342", "name": "L. Park", "email": "l.park@campsentinel.mil",
            "role": "Military Personnel", "base_id": 3
        }),
        json!({
            "service_id": "LO-0215", "name": "O. Saleh", "email": "o.saleh@outpostfalcon.mil",
            "role": "Logistics Officer", "base_id": 4
        }),
        json!({
            "service_id": "LO-0220", "name": "M. Okafor", "email": "m.okafor@baseironclad.mil",
            "role": "Logistics Officer", "base_id": 2
        }),
    ]
}

fn inventory() -> Vec<Value> {
    let row = |id: i64, base: i64, category: &str, model: &str, stock: i64, tin: i64, tout: i64| {
        json!({
            "id": id, "base_id": base, "category": category, "model": model,
            "stock": stock, "metadata": null, "transfer_in": tin, "transfer_out": tout,
            "current_stock": stock + tin - tout
        })
    };
    vec![
        row(1, 2, "Vehicle", "Humvee M1151", 12, 2, 1),
        row(2, 2, "Weapon", "M4 Carbine", 240, 0, 20),
        row(3, 2, "Ammunition", "5.56mm NATO (crate)", 80, 10, 0),
        row(4, 3, "Vehicle", "LAV-25", 6, 0, 0),
        row(5, 3, "Communications", "AN/PRC-117G", 30, 4, 2),
        row(6, 4, "Ammunition", "7.62mm NATO (crate)", 55, 0, 10),
        row(7, 4, "Medical", "Field Trauma Kit", 140, 20, 0),
    ]
}

fn consignments() -> Vec<Value> {
    vec![
        json!({
            "ticket_id": 1001, "from_base": 4, "to_base": 2, "authorized_by": "BC-0107",
            "assigned_to": "LO-0215", "status": "assigned", "updated_by": null, "purchase_orders": 3
        }),
        json!({
            "ticket_id": 1002, "from_base": 2, "to_base": 3, "authorized_by": "BC-0107",
            "assigned_to": "LO-0220", "status": "delivered", "updated_by": "R. Hale",
            "purchase_orders": 5
        }),
    ]
}

/// Builds an in-memory store holding the demo data set.
pub fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new()
        .with_rows(Table::Bases, bases())
        .with_rows(Table::Users, users())
        .with_rows(Table::Inventory, inventory())
        .with_rows(Table::Consignment, consignments());

    DEMO_ACCOUNTS
        .iter()
        .fold(store, |store, account| store.with_account(account.email, account.password))
}
