use crate::{
    entities::{
        product_location, storage_box, storage_location, storage_shelf, ProductLocation,
        StorageBox, StorageLocation, StorageShelf,
    },
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Clone, Debug, Deserialize)]
pub struct CreateLocationInput {
    pub location_code: String,
    pub location_name: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CreateShelfInput {
    pub location_id: i64,
    pub shelf_code: String,
    pub shelf_name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CreateBoxInput {
    pub shelf_id: i64,
    pub box_code: String,
    pub box_label: Option<String>,
}

/// One fully resolved box with its shelf and location codes.
#[derive(Clone, Debug, Serialize)]
pub struct BoxDetails {
    pub box_id: i64,
    pub box_code: String,
    pub box_label: Option<String>,
    pub shelf_id: i64,
    pub shelf_code: String,
    pub shelf_name: String,
    pub location_id: i64,
    pub location_code: String,
    pub location_name: String,
}

/// CRUD over the Location -> Shelf -> Box hierarchy. Rows are soft-deleted
/// (`is_active = false`); deactivation refuses while active children exist.
#[derive(Clone)]
pub struct StorageService {
    db: Arc<DatabaseConnection>,
}

impl StorageService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn create_location(
        &self,
        input: CreateLocationInput,
    ) -> Result<storage_location::Model, ServiceError> {
        let existing = StorageLocation::find()
            .filter(storage_location::Column::LocationCode.eq(input.location_code.clone()))
            .filter(storage_location::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::ValidationError(format!(
                "Location code {} already exists",
                input.location_code
            )));
        }

        let now = Utc::now();
        let location = storage_location::ActiveModel {
            id: NotSet,
            location_code: Set(input.location_code),
            location_name: Set(input.location_name),
            description: Set(input.description),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let location = location.insert(&*self.db).await?;
        info!("Created storage location {}", location.id);
        Ok(location)
    }

    #[instrument(skip(self))]
    pub async fn list_locations(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<storage_location::Model>, ServiceError> {
        let mut query = StorageLocation::find();
        if !include_inactive {
            query = query.filter(storage_location::Column::IsActive.eq(true));
        }
        Ok(query
            .order_by_asc(storage_location::Column::LocationName)
            .all(&*self.db)
            .await?)
    }

    /// Soft-deletes a location. Fails while it still has active shelves.
    #[instrument(skip(self))]
    pub async fn deactivate_location(&self, location_id: i64) -> Result<(), ServiceError> {
        let location = StorageLocation::find_by_id(location_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Location {} not found", location_id))
            })?;

        let active_shelves = StorageShelf::find()
            .filter(storage_shelf::Column::LocationId.eq(location_id))
            .filter(storage_shelf::Column::IsActive.eq(true))
            .count(&*self.db)
            .await?;
        if active_shelves > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "Location {} has {} active shelves",
                location_id, active_shelves
            )));
        }

        let mut location: storage_location::ActiveModel = location.into();
        location.is_active = Set(false);
        location.updated_at = Set(Utc::now());
        location.update(&*self.db).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn create_shelf(
        &self,
        input: CreateShelfInput,
    ) -> Result<storage_shelf::Model, ServiceError> {
        let location = StorageLocation::find_by_id(input.location_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Location {} not found", input.location_id))
            })?;
        if !location.is_active {
            return Err(ServiceError::InvalidOperation(format!(
                "Location {} is inactive",
                input.location_id
            )));
        }

        let existing = StorageShelf::find()
            .filter(storage_shelf::Column::LocationId.eq(input.location_id))
            .filter(storage_shelf::Column::ShelfCode.eq(input.shelf_code.clone()))
            .filter(storage_shelf::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::ValidationError(format!(
                "Shelf code {} already exists in location {}",
                input.shelf_code, input.location_id
            )));
        }

        let now = Utc::now();
        let shelf = storage_shelf::ActiveModel {
            id: NotSet,
            location_id: Set(input.location_id),
            shelf_code: Set(input.shelf_code),
            shelf_name: Set(input.shelf_name),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let shelf = shelf.insert(&*self.db).await?;
        info!("Created shelf {} in location {}", shelf.id, shelf.location_id);
        Ok(shelf)
    }

    #[instrument(skip(self))]
    pub async fn list_shelves(
        &self,
        location_id: i64,
    ) -> Result<Vec<storage_shelf::Model>, ServiceError> {
        Ok(StorageShelf::find()
            .filter(storage_shelf::Column::LocationId.eq(location_id))
            .filter(storage_shelf::Column::IsActive.eq(true))
            .order_by_asc(storage_shelf::Column::ShelfCode)
            .all(&*self.db)
            .await?)
    }

    /// Soft-deletes a shelf. Fails while it still has active boxes.
    #[instrument(skip(self))]
    pub async fn deactivate_shelf(&self, shelf_id: i64) -> Result<(), ServiceError> {
        let shelf = StorageShelf::find_by_id(shelf_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Shelf {} not found", shelf_id)))?;

        let active_boxes = StorageBox::find()
            .filter(storage_box::Column::ShelfId.eq(shelf_id))
            .filter(storage_box::Column::IsActive.eq(true))
            .count(&*self.db)
            .await?;
        if active_boxes > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "Shelf {} has {} active boxes",
                shelf_id, active_boxes
            )));
        }

        let mut shelf: storage_shelf::ActiveModel = shelf.into();
        shelf.is_active = Set(false);
        shelf.updated_at = Set(Utc::now());
        shelf.update(&*self.db).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn create_box(
        &self,
        input: CreateBoxInput,
    ) -> Result<storage_box::Model, ServiceError> {
        let shelf = StorageShelf::find_by_id(input.shelf_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Shelf {} not found", input.shelf_id)))?;
        if !shelf.is_active {
            return Err(ServiceError::InvalidOperation(format!(
                "Shelf {} is inactive",
                input.shelf_id
            )));
        }

        let existing = StorageBox::find()
            .filter(storage_box::Column::ShelfId.eq(input.shelf_id))
            .filter(storage_box::Column::BoxCode.eq(input.box_code.clone()))
            .filter(storage_box::Column::IsActive.eq(true))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::ValidationError(format!(
                "Box code {} already exists on shelf {}",
                input.box_code, input.shelf_id
            )));
        }

        let now = Utc::now();
        let storage_box = storage_box::ActiveModel {
            id: NotSet,
            shelf_id: Set(input.shelf_id),
            box_code: Set(input.box_code),
            box_label: Set(input.box_label),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let storage_box = storage_box.insert(&*self.db).await?;
        info!("Created box {} on shelf {}", storage_box.id, storage_box.shelf_id);
        Ok(storage_box)
    }

    #[instrument(skip(self))]
    pub async fn list_boxes(&self, shelf_id: i64) -> Result<Vec<storage_box::Model>, ServiceError> {
        Ok(StorageBox::find()
            .filter(storage_box::Column::ShelfId.eq(shelf_id))
            .filter(storage_box::Column::IsActive.eq(true))
            .order_by_asc(storage_box::Column::BoxCode)
            .all(&*self.db)
            .await?)
    }

    /// Soft-deletes a box. Fails while product rows still sit in it.
    #[instrument(skip(self))]
    pub async fn deactivate_box(&self, box_id: i64) -> Result<(), ServiceError> {
        let storage_box = StorageBox::find_by_id(box_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Box {} not found", box_id)))?;

        let occupied = ProductLocation::find()
            .filter(product_location::Column::BoxId.eq(box_id))
            .count(&*self.db)
            .await?;
        if occupied > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "Box {} still holds {} product records",
                box_id, occupied
            )));
        }

        let mut storage_box: storage_box::ActiveModel = storage_box.into();
        storage_box.is_active = Set(false);
        storage_box.updated_at = Set(Utc::now());
        storage_box.update(&*self.db).await?;
        Ok(())
    }

    /// Resolves a box to its shelf and location. Used by the tracker when
    /// stamping ledger rows.
    pub async fn resolve_box(&self, box_id: i64) -> Result<BoxDetails, ServiceError> {
        resolve_box_details(&*self.db, box_id).await
    }
}

/// Joins box -> shelf -> location for ledger stamping and search results.
pub(crate) async fn resolve_box_details<C: sea_orm::ConnectionTrait>(
    conn: &C,
    box_id: i64,
) -> Result<BoxDetails, ServiceError> {
    let storage_box = StorageBox::find_by_id(box_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Box {} not found", box_id)))?;
    let shelf = StorageShelf::find_by_id(storage_box.shelf_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Shelf {} not found", storage_box.shelf_id))
        })?;
    let location = StorageLocation::find_by_id(shelf.location_id)
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Location {} not found", shelf.location_id))
        })?;

    Ok(BoxDetails {
        box_id: storage_box.id,
        box_code: storage_box.box_code,
        box_label: storage_box.box_label,
        shelf_id: shelf.id,
        shelf_code: shelf.shelf_code,
        shelf_name: shelf.shelf_name,
        location_id: location.id,
        location_code: location.location_code,
        location_name: location.location_name,
    })
}
