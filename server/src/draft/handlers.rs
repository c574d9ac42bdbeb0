use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::Response,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::Resp;

use super::server::DraftServer;

#[derive(serde::Deserialize)]
pub struct CreateRequest {
    owner: Uuid,
    set: String,
    max_players: Option<usize>,
}

#[derive(serde::Deserialize)]
pub struct PlayerRequest {
    player: Uuid,
}

#[derive(serde::Deserialize)]
pub struct IndexRequest {
    index: usize,
}

pub fn routes(server: Arc<DraftServer>) -> Router {
    Router::new()
        .route("/api/drafts", post(create))
        .route("/api/drafts/:id", get(summary).delete(remove))
        .route("/api/drafts/:id/join", post(join))
        .route("/api/drafts/:id/leave", post(leave))
        .route("/api/drafts/:id/start", post(start))
        .route("/api/players/:player/pack", get(pack))
        .route("/api/players/:player/pool", get(pool))
        .route("/api/players/:player/pick", post(pick))
        .route("/api/players/:player/reserve", post(reserve))
        .with_state(server)
}

pub async fn create(
    State(server): State<Arc<DraftServer>>,
    Json(req): Json<CreateRequest>,
) -> Response<String> {
    match server.create(req.owner, &req.set, req.max_players).await {
        Ok(draft) => Resp::data(&draft),
        Err(e) => Resp::error(&e),
    }
}

pub async fn summary(
    State(server): State<Arc<DraftServer>>,
    Path(id): Path<Uuid>,
) -> Response<String> {
    match server.summary(id).await {
        Ok(draft) => Resp::data(&draft),
        Err(e) => Resp::e404(e),
    }
}

pub async fn remove(
    State(server): State<Arc<DraftServer>>,
    Path(id): Path<Uuid>,
) -> Response<String> {
    match server.remove(id).await {
        Ok(()) => Resp::ok("Draft removed."),
        Err(e) => Resp::e404(e),
    }
}

pub async fn join(
    State(server): State<Arc<DraftServer>>,
    Path(id): Path<Uuid>,
    Json(req): Json<PlayerRequest>,
) -> Response<String> {
    match server.join(id, req.player).await {
        Ok(draft) => Resp::data(&draft),
        Err(e) => Resp::error(&e),
    }
}

pub async fn leave(
    State(server): State<Arc<DraftServer>>,
    Path(id): Path<Uuid>,
    Json(req): Json<PlayerRequest>,
) -> Response<String> {
    match server.leave(id, req.player).await {
        Ok(draft) => Resp::data(&draft),
        Err(e) => Resp::error(&e),
    }
}

pub async fn start(
    State(server): State<Arc<DraftServer>>,
    Path(id): Path<Uuid>,
    Json(req): Json<PlayerRequest>,
) -> Response<String> {
    match server.start(id, req.player).await {
        Ok(draft) => Resp::data(&draft),
        Err(e) => Resp::error(&e),
    }
}

pub async fn pack(
    State(server): State<Arc<DraftServer>>,
    Path(player): Path<Uuid>,
) -> Response<String> {
    match server.pack(player).await {
        Ok(view) => Resp::data(&view),
        Err(e) => Resp::error(&e),
    }
}

pub async fn pool(
    State(server): State<Arc<DraftServer>>,
    Path(player): Path<Uuid>,
) -> Response<String> {
    match server.pool(player).await {
        Ok(view) => Resp::data(&view),
        Err(e) => Resp::error(&e),
    }
}

pub async fn pick(
    State(server): State<Arc<DraftServer>>,
    Path(player): Path<Uuid>,
    Json(req): Json<IndexRequest>,
) -> Response<String> {
    match server.pick(player, req.index).await {
        Ok(card) => Resp::ok(format!("Picked {}.", card.display_name())),
        Err(e) => Resp::error(&e),
    }
}

pub async fn reserve(
    State(server): State<Arc<DraftServer>>,
    Path(player): Path<Uuid>,
    Json(req): Json<IndexRequest>,
) -> Response<String> {
    match server.reserve(player, req.index).await {
        Ok(reserved) => Resp::data(
            &reserved
                .iter()
                .map(|card| card.display_name())
                .collect::<Vec<_>>(),
        ),
        Err(e) => Resp::error(&e),
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use axum::{
        extract::{Path, State},
        http::StatusCode,
        Json,
    };
    use uuid::Uuid;

    use crate::{
        catalog::{SetCatalog, SetData},
        config::DraftConfig,
        draft::{observer::TracingObserver, server::DraftServer},
    };

    use super::{CreateRequest, IndexRequest, PlayerRequest};

    fn server() -> Arc<DraftServer> {
        let mut catalog = SetCatalog::new();
        catalog.add(SetData::sample("TST", 3));
        let config = DraftConfig {
            rounds: 1,
            ..Default::default()
        };
        DraftServer::new(Arc::new(catalog), config, Arc::new(TracingObserver))
    }

    fn body(resp: &axum::http::Response<String>) -> serde_json::Value {
        serde_json::from_str(resp.body()).unwrap()
    }

    #[tokio::test]
    async fn test_create_unknown_set() {
        let resp = super::create(
            State(server()),
            Json(CreateRequest {
                owner: Uuid::new_v4(),
                set: "NOPE".into(),
                max_players: None,
            }),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&resp)["success"], false);
        assert_eq!(body(&resp)["message"], "unknown set: NOPE");
    }

    #[tokio::test]
    async fn test_pick_flow() {
        let server = server();
        let player = Uuid::new_v4();

        let resp = super::create(
            State(server.clone()),
            Json(CreateRequest {
                owner: player,
                set: "TST".into(),
                max_players: Some(1),
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let id: Uuid = serde_json::from_value(body(&resp)["data"]["id"].clone()).unwrap();

        let resp = super::pack(State(server.clone()), Path(player)).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let resp =
            super::join(State(server.clone()), Path(id), Json(PlayerRequest { player })).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body(&resp)["data"]["phase"], "Drafting");

        let resp = super::pack(State(server.clone()), Path(player)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body(&resp)["data"]["status"], "Reviewing");
        assert_eq!(body(&resp)["data"]["cards"].as_array().unwrap().len(), 3);

        let bad = IndexRequest { index: 9 };
        let resp = super::pick(State(server.clone()), Path(player), Json(bad)).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let first = IndexRequest { index: 1 };
        let resp = super::pick(State(server.clone()), Path(player), Json(first)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body(&resp)["message"].as_str().unwrap().starts_with("Picked "));

        let resp = super::pool(State(server.clone()), Path(player)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body(&resp)["data"]["size"], 1);

        let resp = super::remove(State(server.clone()), Path(id)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let resp = super::remove(State(server), Path(id)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
