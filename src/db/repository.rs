//! 저장소 계층
//!
//! 대사는 여러 몰을 하나의 트랜잭션으로 묶어야 하므로 모든 저장소 함수는
//! 풀 대신 `&mut SqliteConnection`을 받는다. 호출자는 `&mut *tx` 또는
//! `&mut *pool.acquire().await?`를 넘긴다.

use chrono::NaiveDateTime;
use sqlx::sqlite::SqliteConnection;
use sqlx::{Error as SqlxError, QueryBuilder, Sqlite};

use super::models::{
    FrozenOrderRow, MallRecord, NewOrder, NewProduct, NewPromotion, OrderRecord, ProductRecord,
    PromotionRecord, SettlementOrderRecord, SettlementRecord,
};
use crate::settlement::model::{SettlementFigures, SettlementKey, SettlementPeriod};

/// 다중 행 INSERT 한 번에 넣는 최대 행 수 (SQLite 바인드 변수 제한 고려)
const BULK_INSERT_CHUNK: usize = 100;

/// IN 절 하나에 넣는 최대 값 수
const IN_CLAUSE_CHUNK: usize = 500;

/// 몰 저장소
pub struct MallRepository;

impl MallRepository {
    /// 몰 등록
    pub async fn insert(conn: &mut SqliteConnection, company_id: i64, name: &str) -> Result<i64, SqlxError> {
        let result = sqlx::query("INSERT INTO malls (company_id, name) VALUES (?, ?)")
            .bind(company_id)
            .bind(name)
            .execute(&mut *conn)
            .await?;

        Ok(result.last_insert_rowid())
    }

    /// 회사의 몰 목록 (이름순, 대사 처리 순서)
    pub async fn find_by_company(conn: &mut SqliteConnection, company_id: i64) -> Result<Vec<MallRecord>, SqlxError> {
        sqlx::query_as::<_, MallRecord>(
            "SELECT id, company_id, name
             FROM malls
             WHERE company_id = ?
             ORDER BY name ASC, id ASC"
        )
        .bind(company_id)
        .fetch_all(&mut *conn)
        .await
    }
}

/// 상품 카탈로그 저장소
pub struct ProductRepository;

impl ProductRepository {
    /// 상품 등록
    pub async fn insert(conn: &mut SqliteConnection, product: &NewProduct) -> Result<i64, SqlxError> {
        let result = sqlx::query(
            "INSERT INTO products (company_id, mapping_code, product_name, sale_price, cost_price)
             VALUES (?, ?, ?, ?, ?)"
        )
        .bind(product.company_id)
        .bind(&product.mapping_code)
        .bind(&product.product_name)
        .bind(product.sale_price)
        .bind(product.cost_price)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// 매핑코드 목록으로 상품 조회 (등록순)
    pub async fn find_by_codes(
        conn: &mut SqliteConnection,
        company_id: i64,
        codes: &[String],
    ) -> Result<Vec<ProductRecord>, SqlxError> {
        let mut products = Vec::new();

        for chunk in codes.chunks(IN_CLAUSE_CHUNK) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "SELECT id, company_id, mapping_code, product_name, sale_price, cost_price
                 FROM products
                 WHERE company_id = ",
            );
            builder.push_bind(company_id);
            builder.push(" AND mapping_code IN (");
            let mut separated = builder.separated(", ");
            for code in chunk {
                separated.push_bind(code.clone());
            }
            separated.push_unseparated(") ORDER BY id ASC");

            let rows = builder
                .build_query_as::<ProductRecord>()
                .fetch_all(&mut *conn)
                .await?;
            products.extend(rows);
        }

        Ok(products)
    }
}

/// 원천 주문 저장소
pub struct OrderRepository;

impl OrderRepository {
    /// 주문 적재
    pub async fn insert(conn: &mut SqliteConnection, order: &NewOrder) -> Result<i64, SqlxError> {
        let row_data = serde_json::Value::Object(order.row_data.clone()).to_string();

        let result = sqlx::query(
            "INSERT INTO orders (company_id, mall_id, shop_name, status, created_at, row_data)
             VALUES (?, ?, ?, ?, ?, ?)"
        )
        .bind(order.company_id)
        .bind(order.mall_id)
        .bind(&order.shop_name)
        .bind(&order.status)
        .bind(order.created_at)
        .bind(row_data)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// 몰/기간 주문 조회: `[start 00:00, end+1일 00:00)`
    pub async fn find_in_period(
        conn: &mut SqliteConnection,
        company_id: i64,
        mall_id: i64,
        period: &SettlementPeriod,
    ) -> Result<Vec<OrderRecord>, SqlxError> {
        sqlx::query_as::<_, OrderRecord>(
            "SELECT id, company_id, mall_id, shop_name, status, created_at, row_data
             FROM orders
             WHERE company_id = ?
               AND mall_id = ?
               AND created_at >= ?
               AND created_at < ?
             ORDER BY created_at ASC, id ASC"
        )
        .bind(company_id)
        .bind(mall_id)
        .bind(period.lower_bound())
        .bind(period.upper_bound())
        .fetch_all(&mut *conn)
        .await
    }
}

/// 정산 저장소
pub struct SettlementRepository;

const SETTLEMENT_COLUMNS: &str = "id, company_id, mall_id, period_start, period_end,
    order_quantity, order_amount, cancel_quantity, cancel_amount,
    net_sales_quantity, net_sales_amount, total_profit_amount, total_profit_rate,
    sales_fee_amount, net_profit_amount, net_profit_rate, created_at, updated_at";

impl SettlementRepository {
    /// (회사, 몰, 기간)으로 정산 조회
    pub async fn find_by_key(
        conn: &mut SqliteConnection,
        key: &SettlementKey,
    ) -> Result<Option<SettlementRecord>, SqlxError> {
        sqlx::query_as::<_, SettlementRecord>(&format!(
            "SELECT {SETTLEMENT_COLUMNS}
             FROM settlements
             WHERE company_id = ? AND mall_id = ? AND period_start = ? AND period_end = ?"
        ))
        .bind(key.company_id)
        .bind(key.mall_id)
        .bind(key.period.start)
        .bind(key.period.end)
        .fetch_optional(&mut *conn)
        .await
    }

    /// 회사 소유 정산만 ID로 조회
    pub async fn find_by_id_for_company(
        conn: &mut SqliteConnection,
        company_id: i64,
        settlement_id: i64,
    ) -> Result<Option<SettlementRecord>, SqlxError> {
        sqlx::query_as::<_, SettlementRecord>(&format!(
            "SELECT {SETTLEMENT_COLUMNS}
             FROM settlements
             WHERE id = ? AND company_id = ?"
        ))
        .bind(settlement_id)
        .bind(company_id)
        .fetch_optional(&mut *conn)
        .await
    }

    /// 회사의 특정 기간 정산 목록
    pub async fn find_by_company_period(
        conn: &mut SqliteConnection,
        company_id: i64,
        period: &SettlementPeriod,
    ) -> Result<Vec<SettlementRecord>, SqlxError> {
        sqlx::query_as::<_, SettlementRecord>(&format!(
            "SELECT {SETTLEMENT_COLUMNS}
             FROM settlements
             WHERE company_id = ? AND period_start = ? AND period_end = ?
             ORDER BY mall_id ASC"
        ))
        .bind(company_id)
        .bind(period.start)
        .bind(period.end)
        .fetch_all(&mut *conn)
        .await
    }

    /// 정산 신규 저장, 생성된 ID 반환
    pub async fn insert(
        conn: &mut SqliteConnection,
        key: &SettlementKey,
        figures: &SettlementFigures,
        now: NaiveDateTime,
    ) -> Result<i64, SqlxError> {
        let result = sqlx::query(
            "INSERT INTO settlements
             (company_id, mall_id, period_start, period_end,
              order_quantity, order_amount, cancel_quantity, cancel_amount,
              net_sales_quantity, net_sales_amount, total_profit_amount, total_profit_rate,
              sales_fee_amount, net_profit_amount, net_profit_rate, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(key.company_id)
        .bind(key.mall_id)
        .bind(key.period.start)
        .bind(key.period.end)
        .bind(figures.order_quantity)
        .bind(figures.order_amount)
        .bind(figures.cancel_quantity)
        .bind(figures.cancel_amount)
        .bind(figures.net_sales_quantity)
        .bind(figures.net_sales_amount)
        .bind(figures.total_profit_amount)
        .bind(figures.total_profit_rate)
        .bind(figures.sales_fee_amount)
        .bind(figures.net_profit_amount)
        .bind(figures.net_profit_rate)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// 정산 수치 전체 덮어쓰기
    pub async fn update(
        conn: &mut SqliteConnection,
        settlement_id: i64,
        figures: &SettlementFigures,
        now: NaiveDateTime,
    ) -> Result<(), SqlxError> {
        sqlx::query(
            "UPDATE settlements
             SET order_quantity = ?, order_amount = ?, cancel_quantity = ?, cancel_amount = ?,
                 net_sales_quantity = ?, net_sales_amount = ?,
                 total_profit_amount = ?, total_profit_rate = ?, sales_fee_amount = ?,
                 net_profit_amount = ?, net_profit_rate = ?, updated_at = ?
             WHERE id = ?"
        )
        .bind(figures.order_quantity)
        .bind(figures.order_amount)
        .bind(figures.cancel_quantity)
        .bind(figures.cancel_amount)
        .bind(figures.net_sales_quantity)
        .bind(figures.net_sales_amount)
        .bind(figures.total_profit_amount)
        .bind(figures.total_profit_rate)
        .bind(figures.sales_fee_amount)
        .bind(figures.net_profit_amount)
        .bind(figures.net_profit_rate)
        .bind(now)
        .bind(settlement_id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// 정산 삭제 (연결 행은 FK CASCADE로 함께 삭제)
    pub async fn delete(conn: &mut SqliteConnection, settlement_id: i64) -> Result<u64, SqlxError> {
        let result = sqlx::query("DELETE FROM settlements WHERE id = ?")
            .bind(settlement_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }
}

/// 정산-주문 연결 원장
pub struct SettlementOrderRepository;

impl SettlementOrderRepository {
    /// 연결 전체 교체: 기존 연결 삭제 후 일괄 삽입 (중복 쌍은 무시)
    ///
    /// 호출자의 트랜잭션 안에서 실행되어야 원자적으로 보인다.
    pub async fn replace_links(
        conn: &mut SqliteConnection,
        settlement_id: i64,
        links: &[SettlementOrderRecord],
    ) -> Result<u64, SqlxError> {
        sqlx::query("DELETE FROM settlement_orders WHERE settlement_id = ?")
            .bind(settlement_id)
            .execute(&mut *conn)
            .await?;

        let mut inserted = 0;
        for chunk in links.chunks(BULK_INSERT_CHUNK) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT OR IGNORE INTO settlement_orders
                 (settlement_id, order_id, snapshot_mapping_code, snapshot_product_name,
                  snapshot_quantity, snapshot_supply_price, snapshot_cost_price,
                  snapshot_order_status, snapshot_order_date) ",
            );
            builder.push_values(chunk, |mut row, link| {
                row.push_bind(settlement_id)
                    .push_bind(link.order_id)
                    .push_bind(link.snapshot_mapping_code.clone())
                    .push_bind(link.snapshot_product_name.clone())
                    .push_bind(link.snapshot_quantity)
                    .push_bind(link.snapshot_supply_price)
                    .push_bind(link.snapshot_cost_price)
                    .push_bind(link.snapshot_order_status.clone())
                    .push_bind(link.snapshot_order_date);
            });

            let result = builder.build().execute(&mut *conn).await?;
            inserted += result.rows_affected();
        }

        Ok(inserted)
    }

    /// 정산에 연결된 주문 ID 목록
    pub async fn read_linked_order_ids(
        conn: &mut SqliteConnection,
        settlement_id: i64,
    ) -> Result<Vec<i64>, SqlxError> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT order_id FROM settlement_orders WHERE settlement_id = ? ORDER BY order_id ASC"
        )
        .bind(settlement_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(|(order_id,)| order_id).collect())
    }

    /// 정산에 연결된 스냅샷 전체
    pub async fn read_links(
        conn: &mut SqliteConnection,
        settlement_id: i64,
    ) -> Result<Vec<SettlementOrderRecord>, SqlxError> {
        sqlx::query_as::<_, SettlementOrderRecord>(
            "SELECT settlement_id, order_id, snapshot_mapping_code, snapshot_product_name,
                    snapshot_quantity, snapshot_supply_price, snapshot_cost_price,
                    snapshot_order_status, snapshot_order_date
             FROM settlement_orders
             WHERE settlement_id = ?
             ORDER BY order_id ASC"
        )
        .bind(settlement_id)
        .fetch_all(&mut *conn)
        .await
    }

    /// 동결 조회용: 스냅샷에 원천 주문의 식별 정보(매장명, 몰, 생성시각)만 붙여 조회
    pub async fn read_frozen_rows(
        conn: &mut SqliteConnection,
        settlement_id: i64,
    ) -> Result<Vec<FrozenOrderRow>, SqlxError> {
        sqlx::query_as::<_, FrozenOrderRow>(
            "SELECT so.order_id, so.snapshot_mapping_code, so.snapshot_product_name,
                    so.snapshot_quantity, so.snapshot_supply_price, so.snapshot_cost_price,
                    so.snapshot_order_status, so.snapshot_order_date,
                    o.shop_name, o.mall_id, o.created_at
             FROM settlement_orders so
             LEFT JOIN orders o ON o.id = so.order_id
             WHERE so.settlement_id = ?
             ORDER BY so.order_id ASC"
        )
        .bind(settlement_id)
        .fetch_all(&mut *conn)
        .await
    }
}

/// 프로모션 저장소
pub struct PromotionRepository;

impl PromotionRepository {
    /// 프로모션 등록 (같은 몰/상품코드면 덮어씀)
    pub async fn upsert(conn: &mut SqliteConnection, promotion: &NewPromotion) -> Result<(), SqlxError> {
        sqlx::query(
            "INSERT INTO promotions (mall_id, product_code, discount_rate, event_price, start_date, end_date)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(mall_id, product_code) DO UPDATE SET
                discount_rate = excluded.discount_rate,
                event_price = excluded.event_price,
                start_date = excluded.start_date,
                end_date = excluded.end_date"
        )
        .bind(promotion.mall_id)
        .bind(&promotion.product_code)
        .bind(promotion.discount_rate)
        .bind(promotion.event_price)
        .bind(promotion.start_date)
        .bind(promotion.end_date)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// (몰, 상품코드)로 프로모션 조회
    pub async fn find(
        conn: &mut SqliteConnection,
        mall_id: i64,
        product_code: &str,
    ) -> Result<Option<PromotionRecord>, SqlxError> {
        sqlx::query_as::<_, PromotionRecord>(
            "SELECT id, mall_id, product_code, discount_rate, event_price, start_date, end_date
             FROM promotions
             WHERE mall_id = ? AND product_code = ?"
        )
        .bind(mall_id)
        .bind(product_code)
        .fetch_optional(&mut *conn)
        .await
    }

    /// 프로모션 삭제. 이미 지워졌으면 0을 반환한다.
    pub async fn delete(conn: &mut SqliteConnection, promotion_id: i64) -> Result<u64, SqlxError> {
        let result = sqlx::query("DELETE FROM promotions WHERE id = ?")
            .bind(promotion_id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected())
    }
}
