//! Store fixtures shared by the contract tests.

use rc_core::models::DEFAULT_COMMENTS_PAGE_SIZE;
use rc_db_memory::MemoryContentStore;
use rc_db_sqlite::SqliteContentStore;
use rc_store::StoreHandle;

pub async fn memory_store() -> StoreHandle {
    StoreHandle::from_store(MemoryContentStore::with_page_size(DEFAULT_COMMENTS_PAGE_SIZE))
}

pub async fn sqlite_store() -> StoreHandle {
    let store = SqliteContentStore::open_in_memory(DEFAULT_COMMENTS_PAGE_SIZE)
        .await
        .expect("in-memory SQLite store");
    StoreHandle::from_store(store)
}
