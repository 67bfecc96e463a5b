//! Command line surface of the storefront client.

use std::fmt::Write as _;
use std::str::FromStr;

use anyhow::bail;
use api::listing::Page;
use api::product::ProductId;
use api::status::ConnectionStatus;
use api::CartLine;
use api::Credentials;
use api::FilterState;
use api::Money;
use api::Product;
use api::Registration;
use api::SortOrder;
use api::StorefrontBackend;
use api::Storefront;
use clap::Args;
use clap::Parser;
use clap::Subcommand;

/// Storefront client: browse the catalog, manage the cart, check out.
#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List one page of the catalog
    Catalog(CatalogArgs),

    /// Show a single product
    Product { id: ProductId },

    /// Sign in and switch to the server cart
    Login { email: String, password: String },

    /// Create an account and sign in
    Register {
        first_name: String,
        last_name: String,
        email: String,
        password: String,
    },

    /// Sign out and switch back to the local cart
    Logout,

    /// Show who is signed in
    #[command(name = "whoami")]
    WhoAmI,

    /// Show the cart
    Cart,

    /// Add one unit of a product to the cart
    Add { id: ProductId },

    /// Remove a product from the cart
    Remove { id: ProductId },

    /// Empty the cart
    Clear,

    /// Place an order for the cart
    Checkout,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct CatalogArgs {
    /// Page to show, starting at 1
    #[arg(default_value_t = 1)]
    pub page: usize,

    /// Suggested keyword, searched on the server
    #[arg(long = "q", conflicts_with = "category")]
    pub keyword: Option<String>,

    /// Case-insensitive title filter
    #[arg(long)]
    pub search: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    /// Minimum price, inclusive
    #[arg(long, value_parser = Money::new_from_str)]
    pub min: Option<Money>,

    /// Maximum price, inclusive
    #[arg(long, value_parser = Money::new_from_str)]
    pub max: Option<Money>,

    /// all, cheap, expensive or popular
    #[arg(long, default_value = "all", value_parser = SortOrder::from_str)]
    pub sort: SortOrder,
}

impl CatalogArgs {
    pub fn filters(&self) -> FilterState {
        let mut filters = FilterState::new();
        if let Some(keyword) = &self.keyword {
            filters.select_keyword(keyword.as_str());
        }
        if let Some(category) = &self.category {
            filters.select_category(category.as_str());
        }
        if let Some(search) = &self.search {
            filters.set_search_query(search.as_str());
        }
        filters.set_min_price(self.min);
        filters.set_max_price(self.max);
        filters
    }
}

impl Command {
    pub async fn run<B: StorefrontBackend>(self, shop: &mut Storefront<B>) -> anyhow::Result<()> {
        println!("{}", self.execute(shop).await?);
        Ok(())
    }

    /// Runs the command and returns what should be printed.
    pub async fn execute<B: StorefrontBackend>(
        self,
        shop: &mut Storefront<B>,
    ) -> anyhow::Result<String> {
        let output = match self {
            Command::Catalog(args) => {
                let (page, sort) = (args.page, args.sort);
                shop.listing.update_filters(|f| *f = args.filters());
                shop.listing.set_sort(sort);
                shop.listing.refresh().await;
                if let ConnectionStatus::Disconnected(reason) = shop.listing.status() {
                    bail!("catalog unavailable: {reason}");
                }
                if page != 1 && !shop.listing.go_to_page(page) {
                    bail!(
                        "page {page} does not exist ({} pages)",
                        shop.listing.total_pages()
                    );
                }
                format_page(&shop.listing.page(), &shop.listing.page_buttons(), sort)
            }
            Command::Product { id } => {
                let product = shop.listing.product(id).await?;
                format_product(&product)
            }
            Command::Login { email, password } => {
                let user = shop.sign_in(&Credentials::new(email, password)).await?;
                format!("Signed in as {}", user.name)
            }
            Command::Register {
                first_name,
                last_name,
                email,
                password,
            } => {
                let registration = Registration {
                    first_name,
                    last_name,
                    email,
                    password,
                };
                let user = shop.register(&registration).await?;
                format!("Registered and signed in as {}", user.name)
            }
            Command::Logout => {
                shop.logout().await;
                "Signed out".to_string()
            }
            Command::WhoAmI => match shop.session.user() {
                Some(user) => format!("Signed in as {}", user.name),
                None if shop.session.is_authenticated() => "Signed in".to_string(),
                None => "Not signed in".to_string(),
            },
            Command::Cart => format_cart(shop.cart.lines(), shop.cart.total()),
            Command::Add { id } => {
                let product = shop.listing.product(id).await?;
                shop.cart.add_to_cart(product.to_cart_line()).await;
                format_cart(shop.cart.lines(), shop.cart.total())
            }
            Command::Remove { id } => {
                shop.cart.remove_from_cart(id).await;
                format_cart(shop.cart.lines(), shop.cart.total())
            }
            Command::Clear => {
                shop.cart.clear_cart().await;
                "Cart cleared".to_string()
            }
            Command::Checkout => {
                if shop.cart.is_empty() {
                    bail!("cart is empty");
                }
                let receipt = shop.cart.checkout().await?;
                match receipt.order_id {
                    Some(order_id) => format!("Checkout successful! Order #{order_id}"),
                    None => "Checkout successful!".to_string(),
                }
            }
        };
        Ok(output)
    }
}

fn format_page(page: &Page<Product>, buttons: &[usize], sort: SortOrder) -> String {
    if page.items.is_empty() {
        return "No products found".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "{} ({} products)", sort.label(), page.total_items);
    for product in &page.items {
        let _ = writeln!(
            out,
            "  #{:<5} {:<40} {:>10}",
            product.id,
            product.title,
            product.price.to_string_with_symbol()
        );
    }
    let buttons: Vec<String> = buttons
        .iter()
        .map(|b| {
            if *b == page.page {
                format!("[{b}]")
            } else {
                b.to_string()
            }
        })
        .collect();
    let _ = write!(out, "page {} of {}: {}", page.page, page.total_pages, buttons.join(" "));
    out
}

fn format_product(product: &Product) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} (#{})", product.title, product.id);
    if !product.description.is_empty() {
        let _ = writeln!(out, "{}", product.description);
    }
    let _ = write!(out, "Price: {}", product.price.to_string_with_symbol());
    out
}

fn format_cart(lines: &[CartLine], total: Money) -> String {
    if lines.is_empty() {
        return "Your cart is empty".to_string();
    }
    let mut out = String::new();
    for line in lines {
        let _ = writeln!(
            out,
            "  {} x {:<40} {:>10}",
            line.quantity,
            line.title,
            line.subtotal().to_string_with_symbol()
        );
    }
    let _ = write!(out, "Total: {}", total.to_string_with_symbol());
    out
}
