pub mod models;
pub mod repository;

use std::str::FromStr;

use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Error as SqlxError;

pub use repository::{
    MallRepository, OrderRepository, ProductRepository, PromotionRepository,
    SettlementOrderRepository, SettlementRepository,
};

/// SQLite 데이터베이스 초기화 및 연결
///
/// 인메모리 DB(`sqlite::memory:`)는 커넥션마다 별도 DB가 되므로 `max_connections`를 1로 준다.
pub async fn init_database(database_url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    info!("🗄️  SQLite 데이터베이스 초기화 중: {}", database_url);

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    // 연결 풀 생성 (유휴 커넥션을 닫으면 인메모리 DB가 사라지므로 수명 제한 없음)
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    // 테이블 생성
    create_tables(&pool).await?;

    info!("✅ 데이터베이스 초기화 완료");

    Ok(pool)
}

/// 필요한 테이블 생성
async fn create_tables(pool: &SqlitePool) -> Result<(), SqlxError> {
    // 몰 테이블
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS malls (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_id INTEGER NOT NULL,
            name TEXT NOT NULL
        )"
    )
    .execute(pool)
    .await?;

    // 상품 카탈로그 테이블
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_id INTEGER NOT NULL,
            mapping_code TEXT NOT NULL,
            product_name TEXT NOT NULL,
            sale_price INTEGER,
            cost_price INTEGER
        )"
    )
    .execute(pool)
    .await?;

    // 원천 주문 테이블
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_id INTEGER NOT NULL,
            mall_id INTEGER,
            shop_name TEXT,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL,
            row_data TEXT NOT NULL DEFAULT '{}'
        )"
    )
    .execute(pool)
    .await?;

    // 정산 테이블
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS settlements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_id INTEGER NOT NULL,
            mall_id INTEGER NOT NULL,
            period_start TEXT NOT NULL,
            period_end TEXT NOT NULL,
            order_quantity INTEGER NOT NULL,
            order_amount INTEGER NOT NULL,
            cancel_quantity INTEGER NOT NULL,
            cancel_amount INTEGER NOT NULL,
            net_sales_quantity INTEGER NOT NULL,
            net_sales_amount INTEGER NOT NULL,
            total_profit_amount INTEGER NOT NULL,
            total_profit_rate REAL NOT NULL,
            sales_fee_amount INTEGER,
            net_profit_amount INTEGER NOT NULL,
            net_profit_rate REAL NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (company_id, mall_id, period_start, period_end)
        )"
    )
    .execute(pool)
    .await?;

    // 정산-주문 연결 테이블 (정산 삭제 시 함께 삭제)
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS settlement_orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            settlement_id INTEGER NOT NULL REFERENCES settlements(id) ON DELETE CASCADE,
            order_id INTEGER NOT NULL,
            snapshot_mapping_code TEXT,
            snapshot_product_name TEXT,
            snapshot_quantity INTEGER,
            snapshot_supply_price INTEGER,
            snapshot_cost_price INTEGER,
            snapshot_order_status TEXT,
            snapshot_order_date TEXT,
            UNIQUE (settlement_id, order_id)
        )"
    )
    .execute(pool)
    .await?;

    // 프로모션 테이블
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS promotions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            mall_id INTEGER NOT NULL,
            product_code TEXT NOT NULL,
            discount_rate REAL,
            event_price INTEGER,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            UNIQUE (mall_id, product_code)
        )"
    )
    .execute(pool)
    .await?;

    // 인덱스 생성
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_mall_period ON orders(company_id, mall_id, created_at)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_code ON products(company_id, mapping_code)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_settlement_orders_settlement ON settlement_orders(settlement_id)")
        .execute(pool)
        .await?;

    info!("📋 테이블 생성 완료");

    Ok(())
}
