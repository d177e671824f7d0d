//! VIVIAS CLI - Shop from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Put two of product 42 in the cart, then apply a coupon
//! vivias cart add 42 -q 2
//! vivias cart coupon apply SAVE10
//!
//! # Save a product and move it to the cart later
//! vivias wishlist add 17
//! vivias wishlist move 17
//!
//! # Sign in (password may come from VIVIAS_PASSWORD)
//! vivias login -e ana@vivias.id
//!
//! # Browse the catalog
//! vivias catalog search kebaya --sort price_asc --max-price 500000
//! ```
//!
//! The session token and sync timestamps are kept in the file named by
//! `VIVIAS_STORAGE_PATH`, so a login survives between invocations.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use vivias_core::{ProductFilter, ProductSort};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "vivias")]
#[command(author, version, about = "VIVIAS SHOP from the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Show and change the wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "VIVIAS_PASSWORD", hide_env_values = true)]
        password: String,

        /// Keep the session after the browser would normally expire it
        #[arg(long)]
        remember: bool,
    },
    /// Create an account and sign in
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "VIVIAS_PASSWORD", hide_env_values = true)]
        password: String,

        /// Repeat the password
        #[arg(long, env = "VIVIAS_PASSWORD_CONFIRMATION", hide_env_values = true)]
        password_confirmation: String,

        #[arg(long)]
        phone: Option<String>,
    },
    /// Sign out and forget local session data
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Browse the catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        product_id: i32,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        #[arg(long)]
        size: Option<String>,

        #[arg(long)]
        color: Option<String>,
    },
    /// Change the quantity of a cart line
    Update { line_id: i32, quantity: u32 },
    /// Remove a cart line
    Remove { line_id: i32 },
    /// Empty the cart
    Clear,
    /// Manage the coupon
    Coupon {
        #[command(subcommand)]
        action: CouponAction,
    },
}

#[derive(Subcommand)]
enum CouponAction {
    /// Apply a coupon code
    Apply { code: String },
    /// Remove the applied coupon
    Remove,
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Show the wishlist
    Show,
    /// Save a product
    Add { product_id: i32 },
    /// Remove a saved product
    Remove { product_id: i32 },
    /// Remove every saved product
    Clear,
    /// Move a saved product into the cart
    Move { product_id: i32 },
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Best-selling products
    Trending {
        #[arg(short, long, default_value_t = 8)]
        limit: u32,
    },
    /// Search products by name or description
    Search {
        query: String,

        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Products of a category
    Category {
        slug: String,

        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Catalog-wide numbers
    Stats,
    /// One product
    Product { id: i32 },
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long)]
    page: Option<u32>,

    #[arg(long)]
    per_page: Option<u32>,

    #[arg(long)]
    min_price: Option<Decimal>,

    #[arg(long)]
    max_price: Option<Decimal>,

    /// One of `newest`, `price_asc`, `price_desc`, `popular`
    #[arg(long, value_parser = parse_sort)]
    sort: Option<ProductSort>,

    /// Only products in stock
    #[arg(long)]
    in_stock: bool,
}

impl From<FilterArgs> for ProductFilter {
    fn from(args: FilterArgs) -> Self {
        Self {
            page: args.page,
            per_page: args.per_page,
            min_price: args.min_price,
            max_price: args.max_price,
            sort: args.sort,
            in_stock: args.in_stock.then_some(true),
        }
    }
}

fn parse_sort(raw: &str) -> Result<ProductSort, String> {
    match raw {
        "newest" => Ok(ProductSort::Newest),
        "price_asc" => Ok(ProductSort::PriceAsc),
        "price_desc" => Ok(ProductSort::PriceDesc),
        "popular" => Ok(ProductSort::Popular),
        other => Err(format!(
            "unknown sort {other}; expected newest, price_asc, price_desc or popular"
        )),
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "vivias_client=warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(report) => {
            #[allow(clippy::print_stdout)]
            {
                println!("{report}");
            }
        }
        Err(e) => {
            tracing::error!("Command failed: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<String, commands::CommandError> {
    let session = commands::Session::start().await?;

    match cli.command {
        Commands::Cart { action } => {
            let cart = session.context().cart();
            match action {
                CartAction::Show => commands::cart::show(cart).await,
                CartAction::Add {
                    product_id,
                    quantity,
                    size,
                    color,
                } => commands::cart::add(cart, product_id, quantity, size, color).await,
                CartAction::Update { line_id, quantity } => {
                    commands::cart::update(cart, line_id, quantity).await
                }
                CartAction::Remove { line_id } => commands::cart::remove(cart, line_id).await,
                CartAction::Clear => commands::cart::clear(cart).await,
                CartAction::Coupon { action } => match action {
                    CouponAction::Apply { code } => commands::cart::apply_coupon(cart, &code).await,
                    CouponAction::Remove => commands::cart::remove_coupon(cart).await,
                },
            }
        }
        Commands::Wishlist { action } => {
            let wishlist = session.context().wishlist();
            match action {
                WishlistAction::Show => commands::wishlist::show(wishlist).await,
                WishlistAction::Add { product_id } => {
                    commands::wishlist::add(wishlist, product_id).await
                }
                WishlistAction::Remove { product_id } => {
                    commands::wishlist::remove(wishlist, product_id).await
                }
                WishlistAction::Clear => commands::wishlist::clear(wishlist).await,
                WishlistAction::Move { product_id } => {
                    commands::wishlist::move_to_cart(session.context(), product_id).await
                }
            }
        }
        Commands::Login {
            email,
            password,
            remember,
        } => commands::account::login(session.context(), &email, password, remember).await,
        Commands::Register {
            name,
            email,
            password,
            password_confirmation,
            phone,
        } => {
            let form = commands::account::RegistrationForm {
                name,
                email,
                password,
                password_confirmation,
                phone,
            };
            commands::account::register(session.context(), form).await
        }
        Commands::Logout => Ok(commands::account::logout(session.context()).await),
        Commands::Whoami => Ok(commands::account::whoami(session.context())),
        Commands::Catalog { action } => {
            let api = session.context().api();
            match action {
                CatalogAction::Trending { limit } => commands::catalog::trending(api, limit).await,
                CatalogAction::Search { query, filter } => {
                    commands::catalog::search(api, &query, &filter.into()).await
                }
                CatalogAction::Category { slug, filter } => {
                    commands::catalog::category(api, &slug, &filter.into()).await
                }
                CatalogAction::Stats => commands::catalog::statistics(api).await,
                CatalogAction::Product { id } => commands::catalog::product(api, id).await,
            }
        }
    }
}
