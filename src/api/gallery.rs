use std::sync::Arc;

use crate::api::collection::ApiCollection;
use crate::app::AppState;
use crate::db::models::GalleryItem;
use crate::db::query::{SortField, SortSpec};
use crate::db::repository::Repository;

impl ApiCollection for GalleryItem {
    const DEFAULT_SORT: SortSpec = SortSpec::ascending(SortField::SortOrder);

    fn repository(state: &AppState) -> Arc<dyn Repository<Self>> {
        state.gallery.clone()
    }
}
