use chrono::Utc;
use common::{BookId, Price, UserId};
use criterion::{Criterion, criterion_group, criterion_main};
use document_store::{
    Book, BookQuery, BookSort, BookStore, Cart, CartStore, InMemoryStore, Rating, StockAdjustment,
};

fn bench_book(title: &str, price_cents: i64, stock: u32) -> Book {
    Book {
        id: BookId::new(),
        title: title.to_string(),
        authors: vec!["Author".to_string()],
        description: "A benchmark book".to_string(),
        categories: vec!["Fiction".to_string()],
        isbn: None,
        price: Price::usd(price_cents),
        stock,
        rating: Rating::none(),
        featured: false,
        is_for_sale: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn bench_decrement_restore(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::new();
    let book = bench_book("Stocked", 1000, 1_000_000);
    rt.block_on(async { store.insert_book(&book).await.unwrap() });
    let adjustments = [StockAdjustment::new(book.id, 1)];

    c.bench_function("store/decrement_restore", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.decrement_stock(&adjustments).await.unwrap();
                store.restore_stock(&adjustments).await.unwrap();
            });
        });
    });
}

fn bench_list_books(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::new();
    rt.block_on(async {
        for i in 0..200i64 {
            let mut book = bench_book(&format!("Book {i:03}"), 100 + i, 5);
            if i % 3 == 0 {
                book.categories = vec!["Programming".to_string()];
            }
            store.insert_book(&book).await.unwrap();
        }
    });

    c.bench_function("store/list_books_filtered", |b| {
        b.iter(|| {
            rt.block_on(async {
                store
                    .list_books(
                        BookQuery::new()
                            .category("Programming")
                            .sort(BookSort::PriceAsc)
                            .per_page(20),
                    )
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_save_cart(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::new();
    let user_id = UserId::new();
    let mut cart = Cart::empty(user_id);
    for _ in 0..10 {
        cart.add_line(BookId::new(), 1, Price::usd(1000));
    }

    c.bench_function("store/save_cart_10_lines", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.save_cart(&cart).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_decrement_restore,
    bench_list_books,
    bench_save_cart,
);
criterion_main!(benches);
