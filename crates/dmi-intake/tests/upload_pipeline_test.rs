//! End-to-end tests for the upload pipeline against local storage and an
//! in-memory record store.

use async_trait::async_trait;
use chrono::Utc;
use rust_xlsxwriter::Workbook;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use uuid::Uuid;

use dmi_core::models::{FileUpload, FileUploadStatus, NewFileUpload};
use dmi_core::{AppError, ErrorMetadata, FileUploadStore, Store};
use dmi_intake::{
    CellValue, IntakeErrorKind, SchemaRegistry, TabularSchema, UploadFile, UploadRequest,
    UploadedFile,
};
use dmi_storage::{LocalStorage, Storage};

/// In-memory record store. `fail_inserts` simulates a database outage.
#[derive(Default)]
struct MemoryStore {
    records: Mutex<HashMap<Uuid, FileUpload>>,
    fail_inserts: bool,
}

#[async_trait]
impl FileUploadStore for MemoryStore {
    async fn create(&self, upload: NewFileUpload) -> Result<FileUpload, AppError> {
        if self.fail_inserts {
            return Err(AppError::Internal("connection refused".to_string()));
        }
        let record = upload.into_record(Utc::now());
        self.records
            .lock()
            .unwrap()
            .insert(record.id, record.clone());
        Ok(record)
    }

    async fn reference_exists(&self, reference: &str) -> Result<bool, AppError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .any(|r| r.reference == reference))
    }

    async fn get(&self, id: Uuid) -> Result<Option<FileUpload>, AppError> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }
}

struct Harness {
    dir: TempDir,
    storage: Arc<LocalStorage>,
    store: Arc<MemoryStore>,
    upload: UploadFile,
}

async fn harness(store: MemoryStore) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(
        LocalStorage::new(dir.path().to_path_buf(), "http://localhost:8000/media".to_string())
            .await
            .unwrap(),
    );
    let store = Arc::new(store);
    let upload = UploadFile::new(
        Arc::new(SchemaRegistry::default()),
        storage.clone(),
        store.clone(),
    );
    Harness {
        dir,
        storage,
        store,
        upload,
    }
}

fn xlsx_fixture(headers: &[&str], rows: &[&[&str]]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    for (r, row) in rows.iter().enumerate() {
        for (col, value) in row.iter().enumerate() {
            let row_idx = (r + 1) as u32;
            match value.parse::<f64>() {
                Ok(number) => sheet.write_number(row_idx, col as u16, number).unwrap(),
                Err(_) => sheet.write_string(row_idx, col as u16, *value).unwrap(),
            };
        }
    }
    workbook.save_to_buffer().unwrap()
}

fn farmer_csv() -> Vec<u8> {
    let mut csv = String::from("Farmer Name,phone number,Gender,State,LGA,Ward,Farm Size,Cooperative\n");
    for i in 0..200 {
        csv.push_str(&format!(
            "Farmer {i},0803{i:07},F,Kano,Dala,Ward {i},1.5,Coop {i}\n"
        ));
    }
    csv.into_bytes()
}

#[tokio::test]
async fn test_csv_with_spaced_headers_validates() {
    let h = harness(MemoryStore::default()).await;
    let mut registry = SchemaRegistry::new(Default::default());
    registry
        .register(TabularSchema::new(
            "contacts",
            ["farmer_name", "phone_number"],
            "",
        ))
        .unwrap();
    let upload = UploadFile::new(Arc::new(registry), h.storage.clone(), h.store.clone());

    let mut csv = String::from("Farmer Name,phone number\n");
    while csv.len() < 10 * 1024 {
        csv.push_str("Amina Bello,08031234567\n");
    }
    let request = UploadRequest::new("contacts", UploadedFile::new("contacts.csv", csv));

    let validated = upload.validate(&request).unwrap();
    assert_eq!(validated.attrs.headers, vec!["farmer_name", "phone_number"]);
    assert_eq!(validated.attrs.ext, ".csv");
    assert!(validated.attrs.row_count > 300);
}

#[tokio::test]
async fn test_pdf_is_unsupported() {
    let h = harness(MemoryStore::default()).await;
    let request = UploadRequest::new(
        "farmer_registry",
        UploadedFile::new("report.pdf", b"%PDF-1.7".to_vec()),
    );
    let err = h.upload.validate(&request).unwrap_err();
    assert_eq!(err.kind(), IntakeErrorKind::UnsupportedFormat);
    let msg = err.to_string();
    for ext in [".csv", ".xls", ".xlsx", ".xlsm"] {
        assert!(msg.contains(ext), "{} missing from '{}'", ext, msg);
    }
}

#[tokio::test]
async fn test_oversized_xlsx_rejected_regardless_of_content() {
    let h = harness(MemoryStore::default()).await;
    let request = UploadRequest::new(
        "farmer_registry",
        UploadedFile::with_declared_size("big.xlsx", 25 * 1000 * 1000, b"not a workbook".to_vec()),
    );
    let err = h.upload.validate(&request).unwrap_err();
    assert_eq!(err.kind(), IntakeErrorKind::FileTooLarge);
}

#[tokio::test]
async fn test_missing_reg_no_is_reported() {
    let h = harness(MemoryStore::default()).await;
    let mut registry = SchemaRegistry::new(Default::default());
    registry
        .register(TabularSchema::new("plots", ["reg_no", "state"], ""))
        .unwrap();
    let upload = UploadFile::new(Arc::new(registry), h.storage.clone(), h.store.clone());

    let request = UploadRequest::new("plots", UploadedFile::new("plots.csv", "state\nKano\n"));
    let err = upload.validate(&request).unwrap_err();
    assert_eq!(err.kind(), IntakeErrorKind::MissingHeaders);
    assert_eq!(
        err.validation_error().unwrap().missing_fields().unwrap(),
        &["reg_no".to_string()]
    );
}

#[tokio::test]
async fn test_corrupt_workbook_is_unreadable() {
    let h = harness(MemoryStore::default()).await;
    let request = UploadRequest::new(
        "crop_production",
        UploadedFile::new("harvest.xlsx", b"PK\x03\x04garbage".to_vec()),
    );
    let err = h.upload.validate(&request).unwrap_err();
    assert_eq!(err.kind(), IntakeErrorKind::UnreadableFile);
    assert!(err.to_string().starts_with("Error processing file:"));
    assert!(err.client_message().starts_with("Unable to read the file."));
    assert!(!err.client_message().to_lowercase().contains("zip"));
}

#[tokio::test]
async fn test_xlsx_upload_end_to_end() {
    let h = harness(MemoryStore::default()).await;
    let data = xlsx_fixture(
        &["State", "LGA", "Season", "Year", "Crop", "Area Planted HA", "Yield Tonnes"],
        &[
            &["Kano", "Dala", "wet", "2023", "maize", "12.5", "30"],
            &["Kaduna", "Zaria", "dry", "2023", "sorghum", "8", "11.25"],
        ],
    );
    let user = Uuid::new_v4();
    let request = UploadRequest::new("crop_production", UploadedFile::new("harvest.xlsx", data.clone()))
        .uploaded_by(user);

    let validated = h.upload.validate(&request).unwrap();
    assert_eq!(validated.attrs.row_count, 2);
    assert_eq!(validated.attrs.target_store, Store::Analytical);
    assert_eq!(
        validated.table.get(0, "crop"),
        Some(&CellValue::String("maize".to_string()))
    );
    assert_eq!(validated.table.get(1, "yield_tonnes"), Some(&CellValue::Float(11.25)));

    let record = h.upload.save(validated).await.unwrap();
    assert_eq!(record.status, FileUploadStatus::Pending);
    assert_eq!(record.extension, ".xlsx");
    assert_eq!(record.file_type, "crop_production");
    assert_eq!(record.uploaded_by, Some(user));
    assert_eq!(record.headers.len(), 7);

    let stored = h.storage.download(&record.original_file).await.unwrap();
    assert_eq!(stored, data);
    assert_eq!(h.store.get(record.id).await.unwrap().unwrap().id, record.id);
}

#[tokio::test]
async fn test_extra_columns_are_kept_on_record() {
    let h = harness(MemoryStore::default()).await;
    let request = UploadRequest::new("Farmer_Registry", UploadedFile::new("farmers.csv", farmer_csv()));
    let record = h.upload.process(&request).await.unwrap();
    assert!(record.headers.contains(&"cooperative".to_string()));
    assert_eq!(record.row_count, 200);
    assert_eq!(record.file_type, "farmer_registry");
}

#[tokio::test]
async fn test_failed_insert_leaves_no_stored_file() {
    let h = harness(MemoryStore {
        fail_inserts: true,
        ..Default::default()
    })
    .await;
    let request = UploadRequest::new("farmer_registry", UploadedFile::new("farmers.csv", farmer_csv()));
    let validated = h.upload.validate(&request).unwrap();

    let err = h.upload.save(validated).await.unwrap_err();
    assert_eq!(err.kind(), IntakeErrorKind::PersistenceFailed);
    assert!(err.to_string().starts_with("Error saving file:"));

    let dir = h.dir.path().join("data/farmer_registry");
    let leftovers = std::fs::read_dir(&dir).map(|d| d.count()).unwrap_or(0);
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_validation_failure_touches_nothing() {
    let h = harness(MemoryStore::default()).await;
    let request = UploadRequest::new(
        "livestock_census",
        UploadedFile::new("census.csv", "state,lga\nKano,Dala\n"),
    );
    assert!(h.upload.process(&request).await.is_err());
    assert!(h.store.records.lock().unwrap().is_empty());
    assert_eq!(std::fs::read_dir(h.dir.path()).unwrap().count(), 0);
}
