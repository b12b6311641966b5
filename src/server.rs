use std::convert::Infallible;

use serde::de::DeserializeOwned;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::asset::AssetId;
use crate::input::{CreateAsset, PatchAsset};
use crate::lifecycle::AssetManager;
use crate::reply::{handle_rejection, reject};
use crate::server::types::ReorderRequest;

pub(crate) mod types;

const MAX_BODY_BYTES: u64 = 64 * 1024;

fn with_manager(
    manager: AssetManager,
) -> impl Filter<Extract = (AssetManager,), Error = Infallible> + Clone {
    warp::any().map(move || manager.clone())
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
{
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

/// The asset API under `/api/v1`. Rejections are left for [handle_rejection].
pub fn make_server(manager: AssetManager) -> BoxedFilter<(impl Reply,)> {
    let assets = warp::path!("api" / "v1" / "assets");
    let asset = warp::path!("api" / "v1" / "assets" / String).map(|id: String| AssetId::from(id));

    let list = assets
        .clone()
        .and(warp::get())
        .and(with_manager(manager.clone()))
        .and_then(list_assets);

    let create = assets
        .and(warp::post())
        .and(json_body::<CreateAsset>())
        .and(with_manager(manager.clone()))
        .and_then(create_asset);

    let reorder = warp::path!("api" / "v1" / "assets" / "order")
        .and(warp::post())
        .and(json_body::<ReorderRequest>())
        .and(with_manager(manager.clone()))
        .and_then(reorder_assets);

    let get = asset
        .clone()
        .and(warp::get())
        .and(with_manager(manager.clone()))
        .and_then(get_asset);

    let replace = asset
        .clone()
        .and(warp::put())
        .and(json_body::<CreateAsset>())
        .and(with_manager(manager.clone()))
        .and_then(replace_asset);

    let update = asset
        .clone()
        .and(warp::patch())
        .and(json_body::<PatchAsset>())
        .and(with_manager(manager.clone()))
        .and_then(update_asset);

    let delete = asset
        .and(warp::delete())
        .and(with_manager(manager.clone()))
        .and_then(delete_asset);

    let playlist = warp::path!("api" / "v1" / "playlist")
        .and(warp::get())
        .and(with_manager(manager))
        .and_then(get_playlist);

    list.or(create)
        .or(reorder)
        .or(get)
        .or(replace)
        .or(update)
        .or(delete)
        .or(playlist)
        .with(warp::trace::request())
        .boxed()
}

/// [make_server] with every rejection rendered as a JSON error.
pub fn routes(
    manager: AssetManager,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    make_server(manager).recover(handle_rejection)
}

async fn list_assets(manager: AssetManager) -> Result<impl Reply, Rejection> {
    let assets = manager.list().map_err(reject)?;
    Ok(warp::reply::json(&assets))
}

async fn create_asset(input: CreateAsset, manager: AssetManager) -> Result<impl Reply, Rejection> {
    let asset = manager.create(input).await.map_err(reject)?;
    Ok(warp::reply::with_status(
        warp::reply::json(&asset),
        StatusCode::CREATED,
    ))
}

async fn reorder_assets(
    request: ReorderRequest,
    manager: AssetManager,
) -> Result<impl Reply, Rejection> {
    let assets = manager.reorder(&request.ids).map_err(reject)?;
    Ok(warp::reply::json(&assets))
}

async fn get_asset(id: AssetId, manager: AssetManager) -> Result<impl Reply, Rejection> {
    let asset = manager.get(&id).map_err(reject)?;
    Ok(warp::reply::json(&asset))
}

async fn replace_asset(
    id: AssetId,
    input: CreateAsset,
    manager: AssetManager,
) -> Result<impl Reply, Rejection> {
    let asset = manager.replace(&id, input).await.map_err(reject)?;
    Ok(warp::reply::json(&asset))
}

async fn update_asset(
    id: AssetId,
    patch: PatchAsset,
    manager: AssetManager,
) -> Result<impl Reply, Rejection> {
    let asset = manager.update(&id, patch).await.map_err(reject)?;
    Ok(warp::reply::json(&asset))
}

async fn delete_asset(id: AssetId, manager: AssetManager) -> Result<impl Reply, Rejection> {
    manager.delete(&id).await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_playlist(manager: AssetManager) -> Result<impl Reply, Rejection> {
    manager.playlist().map_err(reject)
}
