//! `/items` handlers.
//!
//! Each axum handler is a thin wrapper around a function generic over
//! [`ItemStore`] that holds the per-request decision tree.

use axum::{http::StatusCode, Extension, Json};
use tracing::{error, info, warn};
use validator::Validate;

use crate::db::{ItemStore, OperationResult, SqliteRepository, SqliteSession};
use crate::error::{AppError, ErrorResponse, ITEM_ALREADY_EXISTS, ITEM_NOT_FOUND, NAME_TAKEN};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::item::{CreationInput, InventoryItem, ItemOutput, ListParams, UpdateInput};

const CREATE_FAILED: &str = "Could not create item due to an unexpected error.";
const READ_FAILED: &str = "Could not read items due to an unexpected error.";
const UPDATE_FAILED: &str = "Could not update item due to an unexpected error.";
const DELETE_FAILED: &str = "Could not delete item due to an unexpected error.";
const SESSION_FAILED: &str = "Could not open a database session.";

fn internal(message: &str, cause: String) -> AppError {
    error!(error = %cause, "{message}");
    AppError::InternalError(message.to_string())
}

/// Checks out a connection. Called only after every extractor, the request
/// body included, has completed.
async fn open_session(db: &SqliteRepository) -> Result<SqliteSession, AppError> {
    db.session()
        .await
        .map_err(|e| internal(SESSION_FAILED, e.to_string()))
}

#[utoipa::path(
    post,
    path = "/items",
    tag = "Inventory Items",
    request_body = CreationInput,
    responses(
        (status = 201, description = "Item created", body = ItemOutput),
        (status = 409, description = "An item with this name already exists", body = ErrorResponse),
        (status = 422, description = "Invalid payload", body = ErrorResponse),
        (status = 500, description = "Unexpected store error", body = ErrorResponse)
    )
)]
pub async fn create(
    Extension(db): Extension<SqliteRepository>,
    ApiJson(input): ApiJson<CreationInput>,
) -> Result<(StatusCode, Json<ItemOutput>), AppError> {
    let mut session = open_session(&db).await?;
    let item = create_item(&mut session, input).await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

#[utoipa::path(
    get,
    path = "/items",
    tag = "Inventory Items",
    params(ListParams),
    responses(
        (status = 200, description = "A page of items in id order", body = [ItemOutput]),
        (status = 422, description = "Invalid skip or limit", body = ErrorResponse),
        (status = 500, description = "Unexpected store error", body = ErrorResponse)
    )
)]
pub async fn list(
    Extension(db): Extension<SqliteRepository>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<Vec<ItemOutput>>, AppError> {
    let mut session = open_session(&db).await?;
    let items = list_items(&mut session, params).await?;
    Ok(Json(items.into_iter().map(ItemOutput::from).collect()))
}

#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "Inventory Items",
    params(("id" = i64, Path, description = "Item id")),
    responses(
        (status = 200, description = "The item", body = ItemOutput),
        (status = 404, description = "No item with this id", body = ErrorResponse),
        (status = 422, description = "Id is not an integer", body = ErrorResponse),
        (status = 500, description = "Unexpected store error", body = ErrorResponse)
    )
)]
pub async fn get_by_id(
    Extension(db): Extension<SqliteRepository>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ItemOutput>, AppError> {
    let mut session = open_session(&db).await?;
    let item = read_item(&mut session, id).await?;
    Ok(Json(item.into()))
}

#[utoipa::path(
    put,
    path = "/items/{id}",
    tag = "Inventory Items",
    params(("id" = i64, Path, description = "Item id")),
    request_body = UpdateInput,
    responses(
        (status = 200, description = "The updated item", body = ItemOutput),
        (status = 404, description = "No item with this id", body = ErrorResponse),
        (status = 409, description = "Another item already has this name", body = ErrorResponse),
        (status = 422, description = "Invalid payload or id", body = ErrorResponse),
        (status = 500, description = "Unexpected store error", body = ErrorResponse)
    )
)]
pub async fn update(
    Extension(db): Extension<SqliteRepository>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(changes): ApiJson<UpdateInput>,
) -> Result<Json<ItemOutput>, AppError> {
    let mut session = open_session(&db).await?;
    let item = update_item(&mut session, id, changes).await?;
    Ok(Json(item.into()))
}

#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "Inventory Items",
    params(("id" = i64, Path, description = "Item id")),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 404, description = "No item with this id", body = ErrorResponse),
        (status = 422, description = "Id is not an integer", body = ErrorResponse),
        (status = 500, description = "Unexpected store error", body = ErrorResponse)
    )
)]
pub async fn delete(
    Extension(db): Extension<SqliteRepository>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, AppError> {
    let mut session = open_session(&db).await?;
    delete_item(&mut session, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_item<S>(store: &mut S, input: CreationInput) -> Result<InventoryItem, AppError>
where
    S: ItemStore + ?Sized,
{
    let input = input.normalized();
    input.validate()?;
    info!(name = %input.name, "Attempting to create item");

    let existing = store
        .get_by_name(&input.name)
        .await
        .into_found()
        .map_err(|e| internal(CREATE_FAILED, e))?;
    if existing.is_some() {
        warn!(name = %input.name, "Item name already exists (409)");
        return Err(AppError::AlreadyExists(ITEM_ALREADY_EXISTS));
    }

    match store.create(input).await {
        OperationResult::Success(item) => {
            info!(id = item.id, "Successfully created item");
            Ok(item)
        }
        OperationResult::ItemAlreadyExists => {
            warn!("Item name was taken by a concurrent writer (409)");
            Err(AppError::AlreadyExists(ITEM_ALREADY_EXISTS))
        }
        OperationResult::ItemNotFound => Err(internal(
            CREATE_FAILED,
            "insert returned no row".to_string(),
        )),
        OperationResult::InternalError(e) => Err(internal(CREATE_FAILED, e)),
    }
}

pub async fn list_items<S>(store: &mut S, params: ListParams) -> Result<Vec<InventoryItem>, AppError>
where
    S: ItemStore + ?Sized,
{
    params.validate()?;
    let (skip, limit) = (params.skip(), params.limit());
    info!(skip, limit, "Fetching inventory items");

    match store.list(skip, limit).await {
        OperationResult::Success(items) => {
            info!(count = items.len(), "Retrieved items");
            Ok(items)
        }
        OperationResult::ItemNotFound => Ok(Vec::new()),
        OperationResult::ItemAlreadyExists => Err(internal(
            READ_FAILED,
            "unexpected conflict on list".to_string(),
        )),
        OperationResult::InternalError(e) => Err(internal(READ_FAILED, e)),
    }
}

pub async fn read_item<S>(store: &mut S, id: i64) -> Result<InventoryItem, AppError>
where
    S: ItemStore + ?Sized,
{
    info!(id, "Fetching item");
    match store
        .get_by_id(id)
        .await
        .into_found()
        .map_err(|e| internal(READ_FAILED, e))?
    {
        Some(item) => Ok(item),
        None => {
            warn!(id, "Item not found (404)");
            Err(AppError::NotFound(ITEM_NOT_FOUND))
        }
    }
}

pub async fn update_item<S>(
    store: &mut S,
    id: i64,
    changes: UpdateInput,
) -> Result<InventoryItem, AppError>
where
    S: ItemStore + ?Sized,
{
    let changes = changes.normalized();
    changes.validate()?;
    info!(id, "Attempting to update item");

    let current = store
        .get_by_id(id)
        .await
        .into_found()
        .map_err(|e| internal(UPDATE_FAILED, e))?
        .ok_or_else(|| {
            warn!(id, "Item not found for update (404)");
            AppError::NotFound(ITEM_NOT_FOUND)
        })?;

    if let Some(name) = changes.name.as_value() {
        if *name != current.name {
            let holder = store
                .get_by_name(name)
                .await
                .into_found()
                .map_err(|e| internal(UPDATE_FAILED, e))?;
            if holder.is_some_and(|holder| holder.id != id) {
                warn!(id, name = %name, "Name belongs to another item (409)");
                return Err(AppError::AlreadyExists(NAME_TAKEN));
            }
        }
    }

    match store.update(id, changes).await {
        OperationResult::Success(item) => {
            info!(id, "Successfully updated item");
            Ok(item)
        }
        OperationResult::ItemAlreadyExists => {
            warn!(id, "Name was taken by a concurrent writer (409)");
            Err(AppError::AlreadyExists(NAME_TAKEN))
        }
        OperationResult::ItemNotFound => Err(internal(
            UPDATE_FAILED,
            format!("item {id} vanished between lookup and update"),
        )),
        OperationResult::InternalError(e) => Err(internal(UPDATE_FAILED, e)),
    }
}

pub async fn delete_item<S>(store: &mut S, id: i64) -> Result<InventoryItem, AppError>
where
    S: ItemStore + ?Sized,
{
    info!(id, "Attempting to delete item");
    match store.delete(id).await {
        OperationResult::Success(item) => {
            info!(id, "Successfully deleted item");
            Ok(item)
        }
        OperationResult::ItemNotFound => {
            warn!(id, "Item not found for deletion (404)");
            Err(AppError::NotFound(ITEM_NOT_FOUND))
        }
        OperationResult::ItemAlreadyExists => Err(internal(
            DELETE_FAILED,
            "unexpected conflict on delete".to_string(),
        )),
        OperationResult::InternalError(e) => Err(internal(DELETE_FAILED, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockItemStore;
    use crate::models::item::Patch;
    use mockall::predicate::*;

    fn stored(id: i64, name: &str) -> InventoryItem {
        InventoryItem {
            id,
            name: name.to_string(),
            description: None,
            status: true,
        }
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input_before_store_access() {
        let mut store = MockItemStore::new();
        store.expect_get_by_name().never();
        store.expect_create().never();

        let result = create_item(&mut store, CreationInput::new(" ")).await;
        assert!(matches!(result, Err(AppError::ValidationFailed(_))));
    }

    #[tokio::test]
    async fn test_create_precheck_conflict() {
        let mut store = MockItemStore::new();
        store
            .expect_get_by_name()
            .with(eq("Milk"))
            .times(1)
            .returning(|_| OperationResult::Success(stored(1, "Milk")));
        store.expect_create().never();

        let result = create_item(&mut store, CreationInput::new("Milk")).await;
        assert!(matches!(
            result,
            Err(AppError::AlreadyExists(ITEM_ALREADY_EXISTS))
        ));
    }

    #[tokio::test]
    async fn test_create_race_is_reported_as_conflict() {
        let mut store = MockItemStore::new();
        store
            .expect_get_by_name()
            .returning(|_| OperationResult::ItemNotFound);
        store
            .expect_create()
            .times(1)
            .returning(|_| OperationResult::ItemAlreadyExists);

        let result = create_item(&mut store, CreationInput::new("Milk")).await;
        assert!(matches!(result, Err(AppError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_create_store_fault_is_internal() {
        let mut store = MockItemStore::new();
        store
            .expect_get_by_name()
            .returning(|_| OperationResult::ItemNotFound);
        store
            .expect_create()
            .returning(|_| OperationResult::InternalError("disk I/O error".to_string()));

        let result = create_item(&mut store, CreationInput::new("Milk")).await;
        match result {
            Err(AppError::InternalError(message)) => assert_eq!(message, CREATE_FAILED),
            other => panic!("Expected InternalError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_passes_trimmed_input_to_store() {
        let mut store = MockItemStore::new();
        store
            .expect_get_by_name()
            .with(eq("Oat Milk"))
            .returning(|_| OperationResult::ItemNotFound);
        store
            .expect_create()
            .withf(|input| input.name == "Oat Milk" && input.status)
            .returning(|input| OperationResult::Success(stored(7, &input.name)));

        let item = create_item(&mut store, CreationInput::new("  Oat Milk  "))
            .await
            .unwrap();
        assert_eq!(item.id, 7);
    }

    #[tokio::test]
    async fn test_list_rejects_negative_bounds() {
        let mut store = MockItemStore::new();
        store.expect_list().never();

        let params = ListParams {
            skip: None,
            limit: Some(-5),
        };
        let result = list_items(&mut store, params).await;
        assert!(matches!(result, Err(AppError::ValidationFailed(_))));
    }

    #[tokio::test]
    async fn test_list_uses_defaults() {
        let mut store = MockItemStore::new();
        store
            .expect_list()
            .with(eq(0), eq(100))
            .times(1)
            .returning(|_, _| OperationResult::Success(vec![]));

        let items = list_items(&mut store, ListParams::default()).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_read_missing_item() {
        let mut store = MockItemStore::new();
        store
            .expect_get_by_id()
            .with(eq(999))
            .returning(|_| OperationResult::ItemNotFound);

        let result = read_item(&mut store, 999).await;
        assert!(matches!(result, Err(AppError::NotFound(ITEM_NOT_FOUND))));
    }

    #[tokio::test]
    async fn test_update_missing_item() {
        let mut store = MockItemStore::new();
        store
            .expect_get_by_id()
            .returning(|_| OperationResult::ItemNotFound);
        store.expect_update().never();

        let result = update_item(&mut store, 999, UpdateInput::default().with_name("X")).await;
        assert!(matches!(result, Err(AppError::NotFound(ITEM_NOT_FOUND))));
    }

    #[tokio::test]
    async fn test_update_rename_onto_other_item() {
        let mut store = MockItemStore::new();
        store
            .expect_get_by_id()
            .with(eq(2))
            .returning(|_| OperationResult::Success(stored(2, "Item B")));
        store
            .expect_get_by_name()
            .with(eq("Item A"))
            .returning(|_| OperationResult::Success(stored(1, "Item A")));
        store.expect_update().never();

        let result = update_item(&mut store, 2, UpdateInput::default().with_name("Item A")).await;
        assert!(matches!(result, Err(AppError::AlreadyExists(NAME_TAKEN))));
    }

    #[tokio::test]
    async fn test_update_same_name_skips_name_lookup() {
        let mut store = MockItemStore::new();
        store
            .expect_get_by_id()
            .returning(|_| OperationResult::Success(stored(3, "Sugar")));
        store.expect_get_by_name().never();
        store
            .expect_update()
            .withf(|id, changes| {
                *id == 3
                    && changes.name == Patch::Value("Sugar".to_string())
                    && changes.description.is_unset()
            })
            .returning(|_, _| OperationResult::Success(stored(3, "Sugar")));

        let item = update_item(&mut store, 3, UpdateInput::default().with_name("Sugar"))
            .await
            .unwrap();
        assert_eq!(item.name, "Sugar");
    }

    #[tokio::test]
    async fn test_update_vanished_item_is_internal() {
        let mut store = MockItemStore::new();
        store
            .expect_get_by_id()
            .returning(|_| OperationResult::Success(stored(4, "Salt")));
        store
            .expect_update()
            .returning(|_, _| OperationResult::ItemNotFound);

        let result = update_item(&mut store, 4, UpdateInput::default().with_status(false)).await;
        match result {
            Err(AppError::InternalError(message)) => assert_eq!(message, UPDATE_FAILED),
            other => panic!("Expected InternalError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_race_is_reported_as_conflict() {
        let mut store = MockItemStore::new();
        store
            .expect_get_by_id()
            .returning(|_| OperationResult::Success(stored(5, "Rice")));
        store
            .expect_get_by_name()
            .returning(|_| OperationResult::ItemNotFound);
        store
            .expect_update()
            .returning(|_, _| OperationResult::ItemAlreadyExists);

        let result = update_item(&mut store, 5, UpdateInput::default().with_name("Pasta")).await;
        assert!(matches!(result, Err(AppError::AlreadyExists(NAME_TAKEN))));
    }

    #[tokio::test]
    async fn test_delete_missing_item() {
        let mut store = MockItemStore::new();
        store
            .expect_delete()
            .with(eq(999))
            .returning(|_| OperationResult::ItemNotFound);

        let result = delete_item(&mut store, 999).await;
        assert!(matches!(result, Err(AppError::NotFound(ITEM_NOT_FOUND))));
    }
}
