//! Fake shop backend.
//!
//! Implements the cart, wishlist and auth endpoints the client stores call,
//! computing prices, coupons and shipping server-side the way the real
//! backend does. One shared cart and wishlist; tests run one client each.
//!
//! Pricing: shipping is a flat 1000 for a non-empty cart, coupon `SAVE10`
//! takes 10% off the subtotal.

use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Value, json};

use vivias_core::{
    ApiResponse, AppliedCoupon, AuthPayload, CartLine, CartLineId, CartProduct, CartSnapshot,
    CouponDiscount, Email, LoginCredentials, Money, ProductId, Quantity, RegistrationData, User,
    UserId, VariantOptions, WishlistItem, WishlistSnapshot,
};

/// Flat shipping fee for a non-empty cart.
pub const SHIPPING_FEE: i64 = 1000;

/// The only valid coupon.
pub const COUPON_CODE: &str = "SAVE10";

/// Seeded shopper account.
pub const SHOPPER_EMAIL: &str = "ana@vivias.id";
pub const SHOPPER_PASSWORD: &str = "rahasia123";

type Reply = (StatusCode, Json<ApiResponse<Value>>);

#[derive(Debug, Clone)]
struct CatalogEntry {
    name: &'static str,
    price: i64,
    stock: u32,
}

#[derive(Debug, Clone)]
struct Line {
    id: CartLineId,
    product_id: ProductId,
    quantity: NonZeroU32,
    options: VariantOptions,
}

#[derive(Debug, Clone)]
struct Account {
    user: User,
    password: String,
}

#[derive(Debug, Default)]
struct ShopData {
    lines: Vec<Line>,
    next_line: i32,
    coupon: Option<String>,
    wishlist: Vec<ProductId>,
    accounts: Vec<Account>,
    sessions: BTreeMap<String, UserId>,
    next_token: u32,
}

/// Shared state of the fake backend.
#[derive(Debug)]
pub struct FakeShop {
    catalog: BTreeMap<ProductId, CatalogEntry>,
    data: Mutex<ShopData>,
    cart_fetches: AtomicUsize,
    wishlist_fetches: AtomicUsize,
    fail_logout: AtomicBool,
}

impl FakeShop {
    /// A shop with three products and one shopper account.
    ///
    /// | id | product         | price | stock |
    /// |----|-----------------|-------|-------|
    /// | 42 | Kebaya Encim    | 2500  | 200   |
    /// | 7  | Selendang Batik | 1500  | 5     |
    /// | 9  | Tas Anyaman     | 4000  | 0     |
    #[must_use]
    pub fn new() -> Arc<Self> {
        let catalog = BTreeMap::from([
            (
                ProductId::new(42),
                CatalogEntry {
                    name: "Kebaya Encim",
                    price: 2500,
                    stock: 200,
                },
            ),
            (
                ProductId::new(7),
                CatalogEntry {
                    name: "Selendang Batik",
                    price: 1500,
                    stock: 5,
                },
            ),
            (
                ProductId::new(9),
                CatalogEntry {
                    name: "Tas Anyaman",
                    price: 4000,
                    stock: 0,
                },
            ),
        ]);

        let mut data = ShopData {
            next_line: 1,
            next_token: 1,
            ..ShopData::default()
        };
        if let Ok(email) = Email::parse(SHOPPER_EMAIL) {
            data.accounts.push(Account {
                user: User {
                    id: UserId::new(1),
                    name: "Ana".to_string(),
                    email,
                    phone: None,
                },
                password: SHOPPER_PASSWORD.to_string(),
            });
        }

        Arc::new(Self {
            catalog,
            data: Mutex::new(data),
            cart_fetches: AtomicUsize::new(0),
            wishlist_fetches: AtomicUsize::new(0),
            fail_logout: AtomicBool::new(false),
        })
    }

    /// Router with every shop endpoint.
    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route("/api/cart", get(get_cart).delete(clear_cart))
            .route("/api/cart/items", post(add_to_cart))
            .route(
                "/api/cart/items/{id}",
                patch(update_cart_item).delete(remove_from_cart),
            )
            .route("/api/cart/coupon", post(apply_coupon).delete(remove_coupon))
            .route("/api/wishlist", get(get_wishlist).delete(clear_wishlist))
            .route("/api/wishlist/items", post(add_to_wishlist))
            .route(
                "/api/wishlist/items/{product_id}",
                axum::routing::delete(remove_from_wishlist),
            )
            .route(
                "/api/wishlist/items/{product_id}/move-to-cart",
                post(move_to_cart),
            )
            .route("/api/auth/login", post(login))
            .route("/api/auth/register", post(register))
            .route("/api/auth/logout", post(logout))
            .route("/api/auth/me", get(me))
            .with_state(Arc::clone(self))
    }

    /// Number of `GET /api/cart` requests served.
    pub fn cart_fetches(&self) -> usize {
        self.cart_fetches.load(Ordering::SeqCst)
    }

    /// Number of `GET /api/wishlist` requests served.
    pub fn wishlist_fetches(&self) -> usize {
        self.wishlist_fetches.load(Ordering::SeqCst)
    }

    /// Make `POST /api/auth/logout` answer 500.
    pub fn fail_logout(&self, fail: bool) {
        self.fail_logout.store(fail, Ordering::SeqCst);
    }

    /// Number of open sessions.
    pub fn session_count(&self) -> usize {
        self.data().sessions.len()
    }

    fn data(&self) -> MutexGuard<'_, ShopData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cart_snapshot(&self, data: &ShopData) -> CartSnapshot {
        let mut items = Vec::with_capacity(data.lines.len());
        let mut subtotal = Decimal::ZERO;
        let mut count = 0;

        for line in &data.lines {
            let Some(entry) = self.catalog.get(&line.product_id) else {
                continue;
            };
            let unit_price = Decimal::from(entry.price);
            let line_total = unit_price * Decimal::from(line.quantity.get());
            subtotal += line_total;
            count += line.quantity.get();

            items.push(CartLine {
                id: line.id,
                product: CartProduct {
                    id: line.product_id,
                    name: entry.name.to_string(),
                    slug: entry.name.to_lowercase().replace(' ', "-"),
                    image_url: None,
                },
                quantity: line.quantity,
                options: line.options.clone(),
                unit_price: Money::new(unit_price),
                line_total: Money::new(line_total),
            });
        }

        let rate = Decimal::from(10);
        let discount = if data.coupon.is_some() {
            subtotal * rate / Decimal::from(100)
        } else {
            Decimal::ZERO
        };
        let shipping = if items.is_empty() {
            Decimal::ZERO
        } else {
            Decimal::from(SHIPPING_FEE)
        };

        CartSnapshot {
            items,
            item_count: count,
            subtotal: Money::new(subtotal),
            shipping_fee: Money::new(shipping),
            discount: Money::new(discount),
            total: Money::new(subtotal - discount + shipping),
            coupon: data.coupon.as_ref().map(|code| AppliedCoupon {
                code: code.clone(),
                discount: CouponDiscount::Percentage { rate },
            }),
        }
    }

    fn wishlist_snapshot(&self, data: &ShopData) -> WishlistSnapshot {
        let items: Vec<WishlistItem> = data
            .wishlist
            .iter()
            .filter_map(|id| {
                self.catalog.get(id).map(|entry| WishlistItem {
                    product_id: *id,
                    name: entry.name.to_string(),
                    slug: entry.name.to_lowercase().replace(' ', "-"),
                    price: Some(Money::from_whole(entry.price)),
                    image_url: None,
                    added_at: None,
                })
            })
            .collect();
        WishlistSnapshot {
            count: u32::try_from(items.len()).unwrap_or(u32::MAX),
            items,
        }
    }

    /// Add `quantity` of a product, merging with an identical line.
    fn add_line(
        &self,
        data: &mut ShopData,
        product_id: ProductId,
        quantity: Quantity,
        options: VariantOptions,
    ) -> Result<(), Reply> {
        let Some(entry) = self.catalog.get(&product_id) else {
            return Err(failure(StatusCode::NOT_FOUND, "Produk tidak ditemukan"));
        };

        let existing = data
            .lines
            .iter()
            .position(|line| line.product_id == product_id && line.options == options);
        let already = existing
            .and_then(|i| data.lines.get(i))
            .map_or(0, |line| line.quantity.get());
        if already + quantity.get() > entry.stock {
            return Err(failure(StatusCode::OK, "Stok tidak mencukupi"));
        }

        match existing.and_then(|i| data.lines.get_mut(i)) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity.get()),
            None => {
                let id = CartLineId::new(data.next_line);
                data.next_line += 1;
                data.lines.push(Line {
                    id,
                    product_id,
                    quantity: quantity.into(),
                    options,
                });
            }
        }
        Ok(())
    }

    fn authenticate(&self, headers: &HeaderMap) -> Option<User> {
        let token = headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?;
        let data = self.data();
        let user_id = *data.sessions.get(token)?;
        data.accounts
            .iter()
            .find(|account| account.user.id == user_id)
            .map(|account| account.user.clone())
    }

    fn open_session(data: &mut ShopData, user: User) -> AuthPayload {
        let token = format!("tok-{}", data.next_token);
        data.next_token += 1;
        data.sessions.insert(token.clone(), user.id);
        AuthPayload { token, user }
    }
}

fn ok(message: &str) -> Reply {
    (
        StatusCode::OK,
        Json(ApiResponse::ok_with_message(json!({}), message)),
    )
}

fn failure(status: StatusCode, message: &str) -> Reply {
    (status, Json(ApiResponse::failure(message)))
}

fn data_reply<T: serde::Serialize>(data: &T) -> Reply {
    let value = serde_json::to_value(data).unwrap_or(Value::Null);
    (StatusCode::OK, Json(ApiResponse::ok(value)))
}

#[derive(Debug, Deserialize)]
struct AddItemBody {
    product_id: ProductId,
    quantity: u32,
    #[serde(default)]
    options: Option<VariantOptions>,
}

#[derive(Debug, Deserialize)]
struct QuantityBody {
    quantity: u32,
}

#[derive(Debug, Deserialize)]
struct CouponBody {
    code: String,
}

#[derive(Debug, Deserialize)]
struct WishlistBody {
    product_id: ProductId,
}

async fn get_cart(State(shop): State<Arc<FakeShop>>) -> Reply {
    shop.cart_fetches.fetch_add(1, Ordering::SeqCst);
    let data = shop.data();
    data_reply(&shop.cart_snapshot(&data))
}

async fn clear_cart(State(shop): State<Arc<FakeShop>>) -> Reply {
    let mut data = shop.data();
    data.lines.clear();
    data.coupon = None;
    ok("Keranjang dikosongkan")
}

async fn add_to_cart(State(shop): State<Arc<FakeShop>>, Json(body): Json<AddItemBody>) -> Reply {
    let Ok(quantity) = Quantity::new(body.quantity) else {
        return failure(StatusCode::UNPROCESSABLE_ENTITY, "Jumlah tidak valid");
    };
    let mut data = shop.data();
    match shop.add_line(
        &mut data,
        body.product_id,
        quantity,
        body.options.unwrap_or_default(),
    ) {
        Ok(()) => ok("Produk ditambahkan ke keranjang"),
        Err(reply) => reply,
    }
}

async fn update_cart_item(
    State(shop): State<Arc<FakeShop>>,
    Path(id): Path<i32>,
    Json(body): Json<QuantityBody>,
) -> Reply {
    let Ok(quantity) = Quantity::new(body.quantity) else {
        return failure(StatusCode::UNPROCESSABLE_ENTITY, "Jumlah tidak valid");
    };
    let mut data = shop.data();
    let Some(line) = data
        .lines
        .iter_mut()
        .find(|line| line.id == CartLineId::new(id))
    else {
        return failure(StatusCode::NOT_FOUND, "Item keranjang tidak ditemukan");
    };
    let stock = shop.catalog.get(&line.product_id).map_or(0, |e| e.stock);
    if quantity.get() > stock {
        return failure(StatusCode::OK, "Stok tidak mencukupi");
    }
    line.quantity = quantity.into();
    ok("Keranjang diperbarui")
}

async fn remove_from_cart(State(shop): State<Arc<FakeShop>>, Path(id): Path<i32>) -> Reply {
    let mut data = shop.data();
    let before = data.lines.len();
    data.lines.retain(|line| line.id != CartLineId::new(id));
    if data.lines.len() == before {
        return failure(StatusCode::NOT_FOUND, "Item keranjang tidak ditemukan");
    }
    ok("Item dihapus")
}

async fn apply_coupon(State(shop): State<Arc<FakeShop>>, Json(body): Json<CouponBody>) -> Reply {
    if body.code != COUPON_CODE {
        let errors = BTreeMap::from([(
            "code".to_string(),
            vec!["Kupon tidak berlaku".to_string()],
        )]);
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::failure("Kupon tidak valid").with_errors(errors)),
        );
    }
    shop.data().coupon = Some(body.code);
    ok("Kupon diterapkan")
}

async fn remove_coupon(State(shop): State<Arc<FakeShop>>) -> Reply {
    shop.data().coupon = None;
    ok("Kupon dihapus")
}

async fn get_wishlist(State(shop): State<Arc<FakeShop>>) -> Reply {
    shop.wishlist_fetches.fetch_add(1, Ordering::SeqCst);
    let data = shop.data();
    data_reply(&shop.wishlist_snapshot(&data))
}

async fn clear_wishlist(State(shop): State<Arc<FakeShop>>) -> Reply {
    shop.data().wishlist.clear();
    ok("Wishlist dikosongkan")
}

async fn add_to_wishlist(
    State(shop): State<Arc<FakeShop>>,
    Json(body): Json<WishlistBody>,
) -> Reply {
    if !shop.catalog.contains_key(&body.product_id) {
        return failure(StatusCode::NOT_FOUND, "Produk tidak ditemukan");
    }
    let mut data = shop.data();
    if data.wishlist.contains(&body.product_id) {
        return failure(StatusCode::OK, "Produk sudah ada di wishlist");
    }
    data.wishlist.push(body.product_id);
    ok("Ditambahkan ke wishlist")
}

async fn remove_from_wishlist(
    State(shop): State<Arc<FakeShop>>,
    Path(product_id): Path<i32>,
) -> Reply {
    let product_id = ProductId::new(product_id);
    let mut data = shop.data();
    if !data.wishlist.contains(&product_id) {
        return failure(StatusCode::NOT_FOUND, "Produk tidak ada di wishlist");
    }
    data.wishlist.retain(|id| *id != product_id);
    ok("Dihapus dari wishlist")
}

async fn move_to_cart(State(shop): State<Arc<FakeShop>>, Path(product_id): Path<i32>) -> Reply {
    let product_id = ProductId::new(product_id);
    let mut data = shop.data();
    if !data.wishlist.contains(&product_id) {
        return failure(StatusCode::NOT_FOUND, "Produk tidak ada di wishlist");
    }
    if let Err(reply) = shop.add_line(&mut data, product_id, Quantity::ONE, VariantOptions::default()) {
        return reply;
    }
    data.wishlist.retain(|id| *id != product_id);
    ok("Dipindahkan ke keranjang")
}

async fn login(
    State(shop): State<Arc<FakeShop>>,
    Json(credentials): Json<LoginCredentials>,
) -> (StatusCode, Json<ApiResponse<AuthPayload>>) {
    let mut data = shop.data();
    let user = data
        .accounts
        .iter()
        .find(|a| a.user.email == credentials.email && a.password == credentials.password)
        .map(|a| a.user.clone());

    match user {
        Some(user) => {
            let payload = FakeShop::open_session(&mut data, user);
            (StatusCode::OK, Json(ApiResponse::ok(payload)))
        }
        None => (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::failure("Email atau password salah")),
        ),
    }
}

async fn register(
    State(shop): State<Arc<FakeShop>>,
    Json(form): Json<RegistrationData>,
) -> (StatusCode, Json<ApiResponse<AuthPayload>>) {
    let mut data = shop.data();
    if data.accounts.iter().any(|a| a.user.email == form.email) {
        let errors = BTreeMap::from([(
            "email".to_string(),
            vec!["Email sudah terdaftar".to_string()],
        )]);
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::failure("Pendaftaran gagal").with_errors(errors)),
        );
    }

    let id = UserId::new(i32::try_from(data.accounts.len()).unwrap_or(i32::MAX) + 1);
    let user = User {
        id,
        name: form.name,
        email: form.email,
        phone: form.phone,
    };
    data.accounts.push(Account {
        user: user.clone(),
        password: form.password,
    });
    let payload = FakeShop::open_session(&mut data, user);
    (StatusCode::CREATED, Json(ApiResponse::ok(payload)))
}

async fn logout(State(shop): State<Arc<FakeShop>>, headers: HeaderMap) -> Reply {
    if shop.fail_logout.load(Ordering::SeqCst) {
        return failure(StatusCode::INTERNAL_SERVER_ERROR, "Server error");
    }
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned);
    if let Some(token) = token {
        shop.data().sessions.remove(&token);
    }
    ok("Berhasil keluar")
}

async fn me(
    State(shop): State<Arc<FakeShop>>,
    headers: HeaderMap,
) -> (StatusCode, Json<ApiResponse<User>>) {
    shop.authenticate(&headers).map_or_else(
        || {
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::failure("Unauthenticated")),
            )
        },
        |user| (StatusCode::OK, Json(ApiResponse::ok(user))),
    )
}
