use clap::{Parser, Subcommand};
use log::debug;
use shopfront::error::Result;
use shopfront::query::ListParams;
use shopfront::stores::CartItem;
use shopfront::Shopfront;
use std::process;

#[derive(Parser, Debug)]
#[clap(name = "shopfront", version)]
#[clap(about = "Storefront and back-office client", long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and persist the session
    Login { email: String, password: String },
    /// End the session and clear the cart and wishlist
    Logout,
    /// Browse the catalog
    Products {
        #[clap(long, default_value_t = 1)]
        page: u32,
        #[clap(long)]
        limit: Option<u32>,
        #[clap(long)]
        search: Option<String>,
        #[clap(long)]
        category: Option<String>,
    },
    /// Inspect or change the cart
    Cart {
        #[clap(subcommand)]
        action: Option<CartAction>,
    },
    /// Stream the admin inbox until interrupted
    Inbox,
}

#[derive(Subcommand, Debug)]
enum CartAction {
    Show,
    /// Add a product by id
    Add {
        id: String,
        #[clap(long, short, default_value_t = 1)]
        quantity: u32,
    },
    Remove { id: String },
    Clear,
}

async fn run(cli: Cli) -> Result<()> {
    let shop = Shopfront::from_env()?;
    debug!("Using API at {}", shop.config().api_url);

    match cli.command {
        Commands::Login { email, password } => {
            let session = shop.login(&email, &password).await?;
            println!("Signed in as {} ({})", session.user.name, session.role());
        }
        Commands::Logout => {
            shop.logout().await;
            println!("Signed out.");
        }
        Commands::Products {
            page,
            limit,
            search,
            category,
        } => {
            let mut params = ListParams::new(limit.unwrap_or(shop.config().page_size));
            if let Some(search) = search {
                params.set_search(&search);
            }
            if let Some(category) = category {
                params.set_filter("category", &category);
            }
            params.set_page(page);

            let result = shop.api().products().list(&params).await?;
            for product in &result.data {
                let stock = if product.in_stock() { "" } else { "  (out of stock)" };
                println!(
                    "{:<26} {:<40} {:>12}{}",
                    product.id,
                    product.name,
                    shop.formatter().format(product.price),
                    stock
                );
            }
            let p = result.pagination;
            println!("Page {} of {} ({} products)", p.page, p.pages.max(1), p.total);
        }
        Commands::Cart { action } => {
            match action.unwrap_or(CartAction::Show) {
                CartAction::Show => {}
                CartAction::Add { id, quantity } => {
                    let product = shop.api().products().get(&id).await?;
                    let mut item = CartItem::new(&product.id, &product.name, product.price, quantity);
                    item.image = product.image().map(str::to_string);
                    item.in_stock = Some(product.in_stock());
                    item.stock = product.stock;
                    shop.cart().add_item(item);
                }
                CartAction::Remove { id } => shop.cart().remove_item(&id),
                CartAction::Clear => shop.cart().clear(),
            }
            print_cart(&shop);
        }
        Commands::Inbox => {
            let console = shop.admin_chat().await?;
            let mut updates = console.subscribe();
            print_inbox(&console.snapshot().await);
            loop {
                tokio::select! {
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let snapshot = updates.borrow_and_update().clone();
                        print_inbox(&snapshot);
                    }
                    _ = tokio::signal::ctrl_c() => break,
                }
            }
            shop.chat().shutdown().await?;
        }
    }
    Ok(())
}

fn print_cart(shop: &Shopfront) {
    let items = shop.cart().items();
    if items.is_empty() {
        println!("Your cart is empty.");
        return;
    }
    let fmt = shop.formatter();
    for item in &items {
        println!(
            "{:<26} {:<32} {:>4} x {:>10} = {:>12}",
            item.id,
            item.name,
            item.quantity,
            fmt.format(item.price),
            fmt.format(item.line_total())
        );
    }
    println!(
        "{} items, subtotal {}",
        shop.cart().total_items(),
        fmt.format(shop.cart().subtotal())
    );
}

fn print_inbox(snapshot: &shopfront::chat::InboxSnapshot) {
    println!("--- {} unread ---", snapshot.unread_total());
    for conversation in &snapshot.conversations {
        println!(
            "{:<24} {:>3}  {}",
            conversation.user.name,
            conversation.unread_count,
            conversation.last_message.as_deref().unwrap_or("")
        );
    }
}

#[tokio::main]
async fn main() {
    pretty_env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
