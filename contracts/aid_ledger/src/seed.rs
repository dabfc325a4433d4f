//! Example requests written on first start, when storage holds no requests.
//!
//! Kept in the same JSON shape the ledger persists under `aidRequests`.

use crate::error::Result;
use crate::types::AidRequest;

const SEED_REQUESTS: &str = r#"[
  {
    "id": "1",
    "title": "Emergency Medical Supplies for Flood Victims",
    "description": "Antibiotics, bandages and water purification tablets for families displaced by seasonal flooding.",
    "category": "medical",
    "location": "Sylhet, Bangladesh",
    "target": "15.0",
    "raised": "12.3",
    "contributors": 47,
    "daysLeft": 5,
    "urgent": true,
    "verified": true,
    "createdAt": "2024-01-15",
    "creator": "0x742d35Cc6634C0532925a3b844Bc454e4438f44e",
    "status": "active"
  },
  {
    "id": "2",
    "title": "School Supplies for Rural Children",
    "description": "Notebooks, textbooks and solar lamps for a village school serving 120 students without reliable electricity.",
    "category": "education",
    "location": "Kisumu, Kenya",
    "target": "8.0",
    "raised": "3.2",
    "contributors": 23,
    "daysLeft": 12,
    "urgent": false,
    "verified": true,
    "createdAt": "2024-01-10",
    "creator": "0x8ba1f109551bD432803012645Ac136ddd64DBA72",
    "status": "active"
  },
  {
    "id": "3",
    "title": "Earthquake Relief Shelter Kits",
    "description": "Tents, blankets and cooking sets for households left homeless after the earthquake.",
    "category": "disaster",
    "location": "Hatay, Turkey",
    "target": "18.5",
    "raised": "18.5",
    "contributors": 89,
    "daysLeft": 0,
    "urgent": false,
    "verified": true,
    "createdAt": "2024-01-02",
    "creator": "0x1aE0EA34a72D944a8C7603FfB3eC30a6669E454C",
    "status": "completed"
  }
]"#;

pub fn seed_requests() -> Result<Vec<AidRequest>> {
    Ok(serde_json::from_str(SEED_REQUESTS)?)
}
