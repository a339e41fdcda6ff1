use std::sync::Arc;

use folio_db::models::MediaRow;
use folio_db::{CoreError, Database};
use tracing::info;
use uuid::Uuid;

use crate::storage::MediaStorage;

const MAX_FILES: usize = 5;
const MAX_TOTAL_BYTES: u64 = 10 * 1024 * 1024;
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "mp4"];

/// An uploaded file as handed over by the boundary layer.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Media lifecycle tied to blog rows: batch upload with rollback, and row
/// deletion paired with best-effort file removal.
#[derive(Clone)]
pub struct MediaStore {
    db: Arc<Database>,
    storage: Arc<MediaStorage>,
}

impl MediaStore {
    pub fn new(db: Arc<Database>, storage: MediaStorage) -> Self {
        Self {
            db,
            storage: Arc::new(storage),
        }
    }

    pub fn storage(&self) -> &MediaStorage {
        &self.storage
    }

    /// Attach a batch of files to a blog, all-or-nothing.
    ///
    /// Validation happens before anything touches disk. Files are written
    /// first and rows inserted after, in one transaction, so a row never
    /// exists without a backing file. If any step fails partway, every file
    /// written by this call is removed again (best-effort) and the original
    /// error surfaces.
    pub async fn upload_to_blog(
        &self,
        blog_id: &str,
        files: Vec<UploadFile>,
        required: bool,
    ) -> Result<Vec<MediaRow>, CoreError> {
        self.db.blog_by_id(blog_id)?;

        let files = normalize_files(files, required)?;
        if files.is_empty() {
            return Ok(vec![]);
        }

        let mut written: Vec<(String, String, String)> = Vec::with_capacity(files.len());
        for file in &files {
            let ext = allowed_extension(&file.file_name)?;
            let name = format!("{}.{}", Uuid::new_v4(), ext);

            if let Err(e) = self.storage.store(&name, &file.data).await {
                self.discard_batch(&written).await;
                return Err(e);
            }

            let media_type = declared_media_type(file, &ext);
            let url = self.storage.public_url(&name);
            written.push((name, url, media_type));
        }

        let inserted = self.db.with_tx(|tx| {
            let mut rows = Vec::with_capacity(written.len());
            for (_, url, media_type) in &written {
                rows.push(folio_db::media::insert_media(tx, blog_id, url, media_type)?);
            }
            Ok(rows)
        });

        match inserted {
            Ok(rows) => {
                info!("Stored {} media file(s) for blog {}", rows.len(), blog_id);
                Ok(rows)
            }
            Err(e) => {
                self.discard_batch(&written).await;
                Err(e)
            }
        }
    }

    /// Delete one media item: the row first, then the file, best-effort.
    pub async fn delete_media(&self, media_id: &str) -> Result<(), CoreError> {
        let media = self.db.media_by_id(media_id)?;
        self.db
            .with_conn_mut(|conn| folio_db::media::delete_media_row(conn, media_id))?;
        self.storage.remove_url(&media.url).await;
        Ok(())
    }

    /// Bulk variant used when a blog goes away outside a full cascade.
    pub async fn delete_media_by_blog(&self, blog_id: &str) -> Result<(), CoreError> {
        let urls = self
            .db
            .with_tx(|tx| folio_db::media::delete_media_rows_by_blog(tx, blog_id))?;
        for url in &urls {
            self.storage.remove_url(url).await;
        }
        Ok(())
    }

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }

    pub(crate) async fn discard_batch(&self, written: &[(String, String, String)]) {
        for (name, _, _) in written {
            self.storage.remove_file(name).await;
        }
    }

    pub(crate) async fn remove_urls(&self, urls: &[String]) {
        for url in urls {
            self.storage.remove_url(url).await;
        }
    }
}

fn normalize_files(files: Vec<UploadFile>, required: bool) -> Result<Vec<UploadFile>, CoreError> {
    let non_empty: Vec<UploadFile> = files.into_iter().filter(|f| !f.data.is_empty()).collect();

    if non_empty.is_empty() {
        if required {
            return Err(CoreError::bad_request("No files uploaded"));
        }
        return Ok(vec![]);
    }

    if non_empty.len() > MAX_FILES {
        return Err(CoreError::bad_request("Maximum 5 files allowed"));
    }

    let total: u64 = non_empty.iter().map(|f| f.data.len() as u64).sum();
    if total > MAX_TOTAL_BYTES {
        return Err(CoreError::bad_request("Total media size exceeds 10MB"));
    }

    for file in &non_empty {
        allowed_extension(&file.file_name)?;
    }

    Ok(non_empty)
}

fn allowed_extension(file_name: &str) -> Result<String, CoreError> {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()));
    ext.ok_or_else(|| CoreError::bad_request("Only jpg, jpeg, png, or mp4 files are allowed"))
}

fn declared_media_type(file: &UploadFile, ext: &str) -> String {
    match file.content_type.as_deref() {
        Some(ct) if !ct.is_empty() => ct.to_string(),
        _ => mime_guess::from_ext(ext).first_or_octet_stream().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_types::models::BlogStatus;

    async fn store() -> (MediaStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::open_in_memory().unwrap());
        let storage = MediaStorage::new(dir.path().to_path_buf(), "http://localhost:8080")
            .await
            .unwrap();
        (MediaStore::new(db, storage), dir)
    }

    fn seed_blog(store: &MediaStore) -> String {
        let user = store
            .db()
            .register_user("Ada", "L", "ada", "ada@example.com", "hash")
            .unwrap();
        store
            .db()
            .create_blog(&user.id, "T", "content", BlogStatus::Active)
            .unwrap()
            .id
    }

    fn png(name: &str, size: usize) -> UploadFile {
        UploadFile {
            file_name: name.to_string(),
            content_type: Some("image/png".to_string()),
            data: vec![7u8; size],
        }
    }

    fn files_on_disk(dir: &tempfile::TempDir) -> usize {
        std::fs::read_dir(dir.path()).unwrap().count()
    }

    #[tokio::test]
    async fn upload_stores_files_and_rows_in_input_order() {
        let (store, dir) = store().await;
        let blog_id = seed_blog(&store);

        let rows = store
            .upload_to_blog(
                &blog_id,
                vec![png("a.png", 1024), png("b.png", 2048)],
                true,
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(files_on_disk(&dir), 2);
        for row in &rows {
            assert!(row.url.starts_with("http://localhost:8080/uploads/"));
            assert_eq!(row.media_type, "image/png");
            let path = store.storage().path_for_url(&row.url).unwrap();
            assert!(path.exists());
        }
        // listed back in insertion order
        let listed = store.db().media_by_blog(&blog_id).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, rows[0].id);
        assert_eq!(listed[1].id, rows[1].id);
    }

    #[tokio::test]
    async fn nine_megabytes_across_two_files_is_accepted() {
        let (store, dir) = store().await;
        let blog_id = seed_blog(&store);

        let half = 4_500 * 1024;
        let rows = store
            .upload_to_blog(&blog_id, vec![png("a.png", half), png("b.png", half)], true)
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(files_on_disk(&dir), 2);
    }

    #[tokio::test]
    async fn oversized_batch_is_rejected_with_zero_writes() {
        let (store, dir) = store().await;
        let blog_id = seed_blog(&store);

        let six_mb = 6 * 1024 * 1024;
        let result = store
            .upload_to_blog(
                &blog_id,
                vec![png("a.png", six_mb), png("b.png", six_mb)],
                true,
            )
            .await;

        assert!(matches!(result, Err(CoreError::BadRequest(_))));
        assert_eq!(files_on_disk(&dir), 0);
        assert!(store.db().media_by_blog(&blog_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn too_many_files_is_rejected() {
        let (store, dir) = store().await;
        let blog_id = seed_blog(&store);

        let batch: Vec<UploadFile> = (0..6).map(|i| png(&format!("f{i}.png"), 10)).collect();
        let result = store.upload_to_blog(&blog_id, batch, true).await;

        assert!(matches!(result, Err(CoreError::BadRequest(_))));
        assert_eq!(files_on_disk(&dir), 0);
    }

    #[tokio::test]
    async fn disallowed_extension_is_rejected() {
        let (store, dir) = store().await;
        let blog_id = seed_blog(&store);

        let exe = UploadFile {
            file_name: "payload.exe".to_string(),
            content_type: Some("application/octet-stream".to_string()),
            data: vec![1, 2, 3],
        };
        let result = store
            .upload_to_blog(&blog_id, vec![png("ok.png", 10), exe], true)
            .await;

        assert!(matches!(result, Err(CoreError::BadRequest(_))));
        assert_eq!(files_on_disk(&dir), 0);
    }

    #[tokio::test]
    async fn empty_batch_honours_the_required_flag() {
        let (store, _dir) = store().await;
        let blog_id = seed_blog(&store);

        // zero-byte entries are discarded before the required check
        let empty = UploadFile {
            file_name: "empty.png".to_string(),
            content_type: None,
            data: vec![],
        };
        let required = store
            .upload_to_blog(&blog_id, vec![empty.clone()], true)
            .await;
        assert!(matches!(required, Err(CoreError::BadRequest(_))));

        let optional = store.upload_to_blog(&blog_id, vec![empty], false).await.unwrap();
        assert!(optional.is_empty());
    }

    #[tokio::test]
    async fn delete_media_removes_row_then_file() {
        let (store, dir) = store().await;
        let blog_id = seed_blog(&store);

        let rows = store
            .upload_to_blog(&blog_id, vec![png("a.png", 64)], true)
            .await
            .unwrap();
        store.delete_media(&rows[0].id).await.unwrap();

        assert!(store.db().media_by_blog(&blog_id).unwrap().is_empty());
        assert_eq!(files_on_disk(&dir), 0);

        let again = store.delete_media(&rows[0].id).await;
        assert!(matches!(again, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn url_resolution_rejects_traversal() {
        let (store, _dir) = store().await;
        let storage = store.storage();

        assert!(storage.path_for_url("http://localhost:8080/uploads/..").is_none());
        assert!(storage.path_for_url("http://localhost:8080/uploads/").is_none());
        assert!(
            storage
                .path_for_url("http://x/uploads/..%2F..%2Fetc%2Fpasswd\\secret")
                .is_none()
        );
        assert!(storage.path_for_url("http://x/uploads/file.png").is_some());
    }

    #[tokio::test]
    async fn upload_to_missing_blog_is_not_found() {
        let (store, dir) = store().await;
        let result = store
            .upload_to_blog("no-such-blog", vec![png("a.png", 10)], true)
            .await;
        assert!(matches!(result, Err(CoreError::NotFound(_))));
        assert_eq!(files_on_disk(&dir), 0);
    }
}
