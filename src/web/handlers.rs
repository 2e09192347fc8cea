use std::convert::Infallible;
use std::sync::Arc;

use warp::Filter;

use crate::store::AbstractEngine;
use crate::web::schemas::{LeaseTable, StatusResponse};

pub fn filters(
    engine: Arc<dyn AbstractEngine>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let leases = warp::path("leases")
        .and(warp::get())
        .and(with_engine(engine.clone()))
        .and_then(leases_handler);
    let status = warp::path("status")
        .and(warp::get())
        .and(with_engine(engine))
        .and_then(status_handler);
    leases.or(status)
}

fn with_engine(
    engine: Arc<dyn AbstractEngine>,
) -> impl Filter<Extract = (Arc<dyn AbstractEngine>,), Error = Infallible> + Clone {
    warp::any().map(move || engine.clone())
}

pub async fn leases_handler(
    engine: Arc<dyn AbstractEngine>,
) -> Result<impl warp::Reply, Infallible> {
    let table: LeaseTable = engine
        .current_snapshot()
        .map(|snapshot| snapshot.leases)
        .unwrap_or_default();
    Ok(warp::reply::json(&table))
}

pub async fn status_handler(
    engine: Arc<dyn AbstractEngine>,
) -> Result<impl warp::Reply, Infallible> {
    let response = StatusResponse {
        subnet: engine.subnet(),
        meta: engine.meta(),
    };
    Ok(warp::reply::json(&response))
}
