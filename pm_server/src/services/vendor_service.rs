//! Vendors, due diligence and contracts.

use chrono::Utc;

use crate::error::{TrackerError, TrackerResult};
use crate::models::contract::{Contract, NewContract};
use crate::models::vendor::{Blacklisting, DueDiligence, NewVendor, Vendor, VendorStatus};
use crate::store::{Database, Filter, UpdateOp};

pub async fn list_vendors(
    db: &Database,
    status: Option<&str>,
    category: Option<&str>,
) -> TrackerResult<Vec<Vendor>> {
    let filter = Filter::new()
        .eq_opt("status", status)
        .eq_opt("category", category);
    db.vendors.list(&filter).await
}

pub async fn create_vendor(db: &Database, request: NewVendor) -> TrackerResult<Vendor> {
    let vendor = db.vendors.insert(Vendor::new(request, Utc::now())).await?;
    tracing::info!(vendor_id = %vendor.id, code = %vendor.code, "Vendor onboarded");
    Ok(vendor)
}

pub async fn complete_due_diligence(
    db: &Database,
    vendor_id: &str,
    diligence: DueDiligence,
) -> TrackerResult<Vendor> {
    let vendor = db
        .vendors
        .modify(vendor_id, |v| {
            v.complete_due_diligence(&diligence, Utc::now());
            Ok(())
        })
        .await?;
    tracing::info!(vendor_id, status = %vendor.due_diligence_status, "Due diligence recorded");
    Ok(vendor)
}

/// Blacklisting is one-way.
pub async fn blacklist(
    db: &Database,
    vendor_id: &str,
    blacklisting: Blacklisting,
) -> TrackerResult<Vendor> {
    let vendor = db
        .vendors
        .modify(vendor_id, |v| {
            v.blacklist(&blacklisting);
            Ok(())
        })
        .await?;
    tracing::warn!(
        vendor_id,
        reason = vendor.blacklist_reason.as_deref().unwrap_or_default(),
        "Vendor blacklisted"
    );
    Ok(vendor)
}

pub async fn list_contracts(
    db: &Database,
    vendor_id: Option<&str>,
    project_id: Option<&str>,
) -> TrackerResult<Vec<Contract>> {
    let filter = Filter::new()
        .eq_opt("vendor_id", vendor_id)
        .eq_opt("project_id", project_id);
    db.contracts.list(&filter).await
}

/// Record a contract and book it against the vendor's running totals.
pub async fn create_contract(db: &Database, request: NewContract) -> TrackerResult<Contract> {
    let vendor = db.vendors.get(&request.vendor_id).await?;
    if vendor.status == VendorStatus::Blacklisted {
        return Err(TrackerError::Validation(format!(
            "Vendor {} is blacklisted",
            vendor.code
        )));
    }

    let now = Utc::now();
    let contract = db.contracts.insert(Contract::new(request, now)).await?;
    db.vendors
        .update(
            &contract.vendor_id,
            &[
                UpdateOp::increment("contracts_active", 1),
                UpdateOp::increment("total_value", contract.value),
                UpdateOp::set("updated_at", now.to_rfc3339()),
            ],
        )
        .await?;

    tracing::info!(
        contract_id = %contract.id,
        vendor_id = %contract.vendor_id,
        value = contract.value,
        "Contract created"
    );
    Ok(contract)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    async fn vendor(db: &Database) -> Vendor {
        create_vendor(
            db,
            NewVendor {
                name: "Aero Components Ltd".into(),
                code: "ACL-7".into(),
                contact_email: "bids@aerocomponents.example".into(),
                contact_phone: None,
                category: "Avionics".into(),
            },
        )
        .await
        .unwrap()
    }

    fn contract(vendor_id: &str, value: f64) -> NewContract {
        NewContract {
            vendor_id: vendor_id.into(),
            project_id: "proj-1".into(),
            contract_number: "C-2025-001".into(),
            title: "Avionics retrofit".into(),
            value,
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
        }
    }

    #[tokio::test]
    async fn contracts_roll_up_into_vendor_totals() {
        let db = Database::in_memory();
        let v = vendor(&db).await;
        create_contract(&db, contract(&v.id, 1_500.5)).await.unwrap();
        create_contract(&db, contract(&v.id, 500.0)).await.unwrap();

        let stored = db.vendors.get(&v.id).await.unwrap();
        assert_eq!(stored.contracts_active, 2);
        assert_eq!(stored.total_value, 2_000.5);
        assert_eq!(list_contracts(&db, Some(&v.id), None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn blacklisted_vendors_stay_blacklisted() {
        let db = Database::in_memory();
        let v = vendor(&db).await;
        blacklist(
            &db,
            &v.id,
            Blacklisting {
                reason: Some("Counterfeit parts".into()),
                flags: vec!["quality".into()],
            },
        )
        .await
        .unwrap();

        let err = create_contract(&db, contract(&v.id, 10.0)).await.unwrap_err();
        assert!(matches!(err, TrackerError::Validation(_)));

        let patch = json!({"status": "active"});
        let err = db
            .vendors
            .patch(&v.id, patch.as_object().unwrap().clone())
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::Validation(_)));
        assert_eq!(
            db.vendors.get(&v.id).await.unwrap().status,
            VendorStatus::Blacklisted
        );
    }

    #[tokio::test]
    async fn contract_for_unknown_vendor_is_not_found() {
        let db = Database::in_memory();
        let err = create_contract(&db, contract("ghost", 1.0)).await.unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(_)));
        assert!(list_contracts(&db, None, None).await.unwrap().is_empty());
    }
}
