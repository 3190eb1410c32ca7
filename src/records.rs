use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

use chrono::Utc;

use crate::classify::is_html;
use crate::error::AppError;
use crate::models::{FileRecord, NewFileRecord};

const TABLE_FILE: &str = "files.json";

/// The `files` record table, held in memory and persisted as JSON on every write.
pub struct RecordTable {
    path: PathBuf,
    /// Rows in insertion order
    rows: RwLock<Vec<FileRecord>>,
}

impl RecordTable {
    pub fn open(root: &str) -> Result<Self, AppError> {
        let root = PathBuf::from(root);
        fs::create_dir_all(&root)
            .map_err(|e| AppError::StorageError(format!("Cannot create data dir: {}", e)))?;

        let path = root.join(TABLE_FILE);
        let rows = if path.exists() {
            let data = fs::read_to_string(&path)?;
            serde_json::from_str::<Vec<FileRecord>>(&data)?
        } else {
            Vec::new()
        };

        tracing::debug!("Loaded {} file records from {}", rows.len(), path.display());
        Ok(Self {
            path,
            rows: RwLock::new(rows),
        })
    }

    fn persist(&self, rows: &[FileRecord]) -> Result<(), AppError> {
        let json = serde_json::to_string_pretty(rows)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Insert a row, assigning its id, upload date and a zero download count.
    pub fn insert(&self, new: NewFileRecord) -> Result<FileRecord, AppError> {
        let mut rows = self.rows.write().unwrap();
        if rows.iter().any(|r| r.storage_path == new.storage_path) {
            return Err(AppError::StorageKeyTaken(new.storage_path));
        }

        let record = FileRecord {
            id: uuid::Uuid::new_v4().to_string(),
            filename: new.filename,
            original_name: new.original_name,
            file_type: new.file_type,
            file_size: new.file_size,
            storage_path: new.storage_path,
            upload_date: Utc::now(),
            download_count: 0,
        };

        rows.push(record.clone());
        if let Err(e) = self.persist(&rows) {
            rows.pop();
            return Err(e);
        }

        tracing::info!("Inserted file record {} ({})", record.id, record.storage_path);
        Ok(record)
    }

    /// All rows, newest first. Rows sharing a timestamp come back latest insert first.
    pub fn list(&self) -> Vec<FileRecord> {
        let rows = self.rows.read().unwrap();
        newest_first(rows.iter().rev().cloned().collect())
    }

    /// Rows describing HTML pages, newest first.
    pub fn list_html(&self) -> Vec<FileRecord> {
        let rows = self.rows.read().unwrap();
        newest_first(
            rows.iter()
                .rev()
                .filter(|r| is_html(&r.original_name, &r.file_type))
                .cloned()
                .collect(),
        )
    }

    pub fn get(&self, id: &str) -> Option<FileRecord> {
        let rows = self.rows.read().unwrap();
        rows.iter().find(|r| r.id == id).cloned()
    }

    /// Overwrite a row's download counter. No version check: the last writer wins.
    pub fn update_download_count(&self, id: &str, count: u64) -> Result<FileRecord, AppError> {
        let mut rows = self.rows.write().unwrap();
        let idx = rows
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| AppError::FileNotFound(id.to_string()))?;

        let previous = rows[idx].download_count;
        rows[idx].download_count = count;
        if let Err(e) = self.persist(&rows) {
            rows[idx].download_count = previous;
            return Err(e);
        }

        Ok(rows[idx].clone())
    }
}

fn newest_first(mut rows: Vec<FileRecord>) -> Vec<FileRecord> {
    rows.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_table() -> (TempDir, RecordTable) {
        let temp_dir = TempDir::new().unwrap();
        let table = RecordTable::open(temp_dir.path().to_str().unwrap()).unwrap();
        (temp_dir, table)
    }

    fn new_record(name: &str, file_type: &str, path: &str) -> NewFileRecord {
        NewFileRecord {
            filename: path.rsplit('/').next().unwrap().to_string(),
            original_name: name.to_string(),
            file_type: file_type.to_string(),
            file_size: 10,
            storage_path: path.to_string(),
        }
    }

    #[test]
    fn test_insert_assigns_fields() {
        let (_temp_dir, table) = setup_table();

        let record = table
            .insert(new_record("cat.png", "image/png", "uploads/1-a.png"))
            .unwrap();
        assert!(!record.id.is_empty());
        assert_eq!(record.download_count, 0);
        assert_eq!(table.get(&record.id), Some(record));
        assert!(table.get("missing").is_none());
    }

    #[test]
    fn test_insert_rejects_duplicate_storage_path() {
        let (_temp_dir, table) = setup_table();

        table.insert(new_record("a.png", "image/png", "uploads/same.png")).unwrap();
        let err = table
            .insert(new_record("b.png", "image/png", "uploads/same.png"))
            .unwrap_err();
        assert!(matches!(err, AppError::StorageKeyTaken(_)));
        assert_eq!(table.list().len(), 1);
    }

    #[test]
    fn test_list_is_newest_first() {
        let (_temp_dir, table) = setup_table();

        let first = table.insert(new_record("1.txt", "text/plain", "uploads/1.txt")).unwrap();
        let second = table.insert(new_record("2.txt", "text/plain", "uploads/2.txt")).unwrap();
        let third = table.insert(new_record("3.txt", "text/plain", "uploads/3.txt")).unwrap();

        let ids: Vec<String> = table.list().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);

        let rows = table.list();
        assert!(rows.windows(2).all(|w| w[0].upload_date >= w[1].upload_date));
    }

    #[test]
    fn test_list_html_is_exactly_the_page_subset() {
        let (_temp_dir, table) = setup_table();

        table.insert(new_record("cat.png", "image/png", "uploads/a.png")).unwrap();
        let by_name = table.insert(new_record("report.HTML", "", "sites/1/index.html")).unwrap();
        table.insert(new_record("notes.txt", "text/plain", "uploads/b.txt")).unwrap();
        let by_mime = table.insert(new_record("page", "text/html", "sites/2/index.html")).unwrap();
        let by_htm = table.insert(new_record("old.htm", "text/plain", "sites/3/index.html")).unwrap();

        let ids: Vec<String> = table.list_html().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![by_htm.id, by_mime.id, by_name.id]);
    }

    #[test]
    fn test_update_download_count() {
        let (_temp_dir, table) = setup_table();

        let record = table.insert(new_record("a.txt", "text/plain", "uploads/a.txt")).unwrap();
        let updated = table.update_download_count(&record.id, 6).unwrap();
        assert_eq!(updated.download_count, 6);
        assert_eq!(table.get(&record.id).unwrap().download_count, 6);

        let err = table.update_download_count("missing", 1).unwrap_err();
        assert!(matches!(err, AppError::FileNotFound(_)));
    }

    #[test]
    fn test_rows_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_str().unwrap();

        let record = {
            let table = RecordTable::open(root).unwrap();
            let r = table.insert(new_record("a.txt", "text/plain", "uploads/a.txt")).unwrap();
            table.update_download_count(&r.id, 3).unwrap()
        };

        let table = RecordTable::open(root).unwrap();
        assert_eq!(table.get(&record.id), Some(record));
    }
}
