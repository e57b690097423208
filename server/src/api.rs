use crate::{
    room::{Mailbox, MailboxError},
    RateLimit,
};
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use commonware_codec::Encode;
use futures::{SinkExt, StreamExt};
use skytrax_engine::{MemoryWallet, Wallet, WalletError};
use skytrax_types::{
    api::{
        ActiveBetView, AutoBetRequest, AutoCashoutRequest, BalanceResponse, CashOutRequest,
        CashOutResponse, DepositRequest, ErrorResponse, PlaceBetRequest, PlaceBetResponse,
        PlayerView,
    },
    BetError, CashoutError, RoundSnapshot, UserId, MAX_USER_ID_LENGTH,
};
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::broadcast::error::RecvError;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

#[derive(Clone)]
struct AppState {
    rooms: Arc<BTreeMap<String, Mailbox>>,
    wallet: Arc<MemoryWallet>,
}

impl AppState {
    fn room(&self, name: &str) -> Result<&Mailbox, ApiError> {
        self.rooms.get(name).ok_or(ApiError::UnknownRoom)
    }
}

/// Failure of an API request, rendered as a status code and a reason code.
#[derive(Debug)]
pub enum ApiError {
    UnknownRoom,
    InvalidUser,
    Bet(BetError),
    Cashout(CashoutError),
    Wallet(WalletError),
    Mailbox(MailboxError),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::UnknownRoom => (StatusCode::NOT_FOUND, "unknown_room"),
            Self::InvalidUser => (StatusCode::BAD_REQUEST, "invalid_user"),
            Self::Bet(e) => {
                let status = match e {
                    BetError::NotBettingPhase | BetError::BetAlreadyActive => StatusCode::CONFLICT,
                    BetError::InvalidAmount => StatusCode::BAD_REQUEST,
                    BetError::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
                    BetError::LedgerUpdateFailed => StatusCode::BAD_GATEWAY,
                };
                (status, e.code())
            }
            Self::Cashout(e) => {
                let status = match e {
                    CashoutError::NoActiveBet | CashoutError::NotPlayingPhase => {
                        StatusCode::CONFLICT
                    }
                    CashoutError::LedgerUpdateFailed => StatusCode::BAD_GATEWAY,
                };
                (status, e.code())
            }
            Self::Wallet(e) => match e {
                WalletError::InsufficientFunds { .. } => {
                    (StatusCode::PAYMENT_REQUIRED, "insufficient_funds")
                }
                WalletError::InvalidDeposit { .. } => (StatusCode::BAD_REQUEST, "invalid_deposit"),
                WalletError::Overflow => (StatusCode::BAD_REQUEST, "balance_overflow"),
                WalletError::Unavailable(_) => (StatusCode::BAD_GATEWAY, "ledger_update_failed"),
            },
            Self::Mailbox(_) => (StatusCode::SERVICE_UNAVAILABLE, "room_unavailable"),
        }
    }
}

impl From<MailboxError> for ApiError {
    fn from(e: MailboxError) -> Self {
        warn!(error = %e, "room unavailable");
        Self::Mailbox(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        (
            status,
            Json(ErrorResponse {
                error: code.to_string(),
            }),
        )
            .into_response()
    }
}

fn check_user(user: &UserId) -> Result<(), ApiError> {
    let len = user.as_str().len();
    if len == 0 || len > MAX_USER_ID_LENGTH {
        return Err(ApiError::InvalidUser);
    }
    Ok(())
}

pub struct Api {
    state: AppState,
    rate_limit: Option<RateLimit>,
}

impl Api {
    pub fn new(
        rooms: BTreeMap<String, Mailbox>,
        wallet: Arc<MemoryWallet>,
        rate_limit: Option<RateLimit>,
    ) -> Self {
        Self {
            state: AppState {
                rooms: Arc::new(rooms),
                wallet,
            },
            rate_limit,
        }
    }

    pub fn router(&self) -> Router {
        // Configure CORS
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);

        let mut router = Router::new()
            .route("/rooms", get(list_rooms))
            .route("/rooms/:room/state", get(room_state))
            .route("/rooms/:room/bets", get(active_bets).post(place_bet))
            .route("/rooms/:room/cashout", post(cash_out))
            .route("/rooms/:room/players/:user", get(player))
            .route("/rooms/:room/players/:user/auto-bet", put(set_auto_bet))
            .route(
                "/rooms/:room/players/:user/auto-cashout",
                put(set_auto_cashout),
            )
            .route("/rooms/:room/updates", get(updates_ws))
            .route("/wallets/:user", get(balance))
            .route("/wallets/:user/deposit", post(deposit))
            .layer(cors);

        // Configure rate limiting
        if let Some(rate_limit) = self.rate_limit {
            match GovernorConfigBuilder::default()
                .per_millisecond((1_000 / rate_limit.per_second).max(1))
                .burst_size(rate_limit.burst)
                .key_extractor(SmartIpKeyExtractor)
                .finish()
            {
                Some(config) => {
                    router = router.layer(GovernorLayer {
                        config: Arc::new(config),
                    });
                }
                None => warn!(?rate_limit, "invalid rate limit, serving without one"),
            }
        }

        router.with_state(self.state.clone())
    }
}

async fn list_rooms(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.rooms.keys().cloned().collect())
}

async fn room_state(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<Json<RoundSnapshot>, ApiError> {
    Ok(Json(state.room(&room)?.snapshot().await?))
}

async fn active_bets(
    State(state): State<AppState>,
    Path(room): Path<String>,
) -> Result<Json<Vec<ActiveBetView>>, ApiError> {
    Ok(Json(state.room(&room)?.active_bets().await?))
}

async fn place_bet(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Json(request): Json<PlaceBetRequest>,
) -> Result<Json<PlaceBetResponse>, ApiError> {
    check_user(&request.user)?;
    let bet_id = state
        .room(&room)?
        .place_bet(request.user, request.amount)
        .await?
        .map_err(ApiError::Bet)?;
    Ok(Json(PlaceBetResponse { bet_id }))
}

async fn cash_out(
    State(state): State<AppState>,
    Path(room): Path<String>,
    Json(request): Json<CashOutRequest>,
) -> Result<Json<CashOutResponse>, ApiError> {
    check_user(&request.user)?;
    let settlement = state
        .room(&room)?
        .cash_out(request.user)
        .await?
        .map_err(ApiError::Cashout)?;
    Ok(Json(CashOutResponse {
        multiplier: settlement.multiplier,
        winnings: settlement.winnings,
    }))
}

async fn player(
    State(state): State<AppState>,
    Path((room, user)): Path<(String, UserId)>,
) -> Result<Json<PlayerView>, ApiError> {
    check_user(&user)?;
    Ok(Json(state.room(&room)?.player(user).await?))
}

async fn set_auto_bet(
    State(state): State<AppState>,
    Path((room, user)): Path<(String, UserId)>,
    Json(request): Json<AutoBetRequest>,
) -> Result<StatusCode, ApiError> {
    check_user(&user)?;
    state
        .room(&room)?
        .set_auto_bet(user, request.amount)
        .await?
        .map_err(ApiError::Bet)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_auto_cashout(
    State(state): State<AppState>,
    Path((room, user)): Path<(String, UserId)>,
    Json(request): Json<AutoCashoutRequest>,
) -> Result<StatusCode, ApiError> {
    check_user(&user)?;
    state
        .room(&room)?
        .set_auto_cashout(user, request.target)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn balance(
    State(state): State<AppState>,
    Path(user): Path<UserId>,
) -> Result<Json<BalanceResponse>, ApiError> {
    check_user(&user)?;
    let balance = state.wallet.balance(&user);
    Ok(Json(BalanceResponse { user, balance }))
}

async fn deposit(
    State(state): State<AppState>,
    Path(user): Path<UserId>,
    Json(request): Json<DepositRequest>,
) -> Result<Json<BalanceResponse>, ApiError> {
    check_user(&user)?;
    let balance = state
        .wallet
        .deposit(&user, request.amount)
        .map_err(ApiError::Wallet)?;
    info!(%user, amount = request.amount, balance, "deposit");
    Ok(Json(BalanceResponse { user, balance }))
}

async fn updates_ws(
    State(state): State<AppState>,
    Path(room): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let mailbox = state.room(&room)?.clone();
    Ok(ws.on_upgrade(move |socket| handle_updates_ws(socket, mailbox, room)))
}

async fn handle_updates_ws(socket: WebSocket, mailbox: Mailbox, room: String) {
    info!(%room, "updates websocket connected");
    let (mut sender, mut receiver) = socket.split();
    let mut events = mailbox.subscribe();

    loop {
        tokio::select! {
            // Handle incoming websocket messages (ping/pong/close)
            message = receiver.next() => {
                match message {
                    Some(Ok(WsMessage::Close(_))) | None => {
                        debug!(%room, "client closed websocket");
                        break;
                    }
                    Some(Ok(WsMessage::Ping(data))) => {
                        if sender.send(WsMessage::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(%room, error = %e, "websocket error");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
            // Forward room events
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if sender
                            .send(WsMessage::Binary(event.encode().to_vec()))
                            .await
                            .is_err()
                        {
                            debug!(%room, "client disconnected");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%room, skipped, "websocket client lagged behind");
                    }
                    Err(RecvError::Closed) => {
                        info!(%room, "room closed");
                        break;
                    }
                }
            }
        }
    }
    info!(%room, "updates websocket disconnected");
    let _ = sender.close().await;
}
