//! 정산 주문 조회 (동결/실시간)
//!
//! - 동결: 정산 ID 기준. 금액/상품 필드는 대사 시점 스냅샷에서만 복원하고
//!   카탈로그 현재가는 다시 보지 않는다. 매장명, 몰, 주문 생성시각만 원천 주문에서 붙인다.
//! - 실시간: 몰/기간 기준. 집계기와 같은 조회/해석을 다시 수행하며 정산 상태는 보지 않는다.
//!
//! 두 모드 모두 프로모션 오버레이를 거친 같은 모양의 결과를 반환한다.

use chrono::NaiveDate;
use log::debug;
use sqlx::sqlite::SqlitePool;

use crate::db::models::{FrozenOrderRow, SettlementRecord};
use crate::db::repository::{SettlementOrderRepository, SettlementRepository};
use crate::error::{SettlementError, SettlementResult};
use crate::settlement::aggregator::load_mall_orders;
use crate::settlement::fields::{DEFAULT_PRICE, DEFAULT_QUANTITY};
use crate::settlement::model::{SettlementOrderView, SettlementPeriod};
use crate::settlement::promotion::PromotionOverlay;

/// 정산 주문 조회기
#[derive(Clone)]
pub struct SnapshotReader {
    pool: SqlitePool,
}

impl SnapshotReader {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 동결 조회. 회사 소유가 아닌 정산이면 빈 목록.
    pub async fn read_frozen(
        &self,
        company_id: i64,
        settlement_id: i64,
        today: NaiveDate,
    ) -> SettlementResult<Vec<SettlementOrderView>> {
        validate_company(company_id)?;
        if settlement_id <= 0 {
            return Err(SettlementError::validation(format!(
                "정산 ID가 올바르지 않습니다: {}",
                settlement_id
            )));
        }

        let mut conn = self.pool.acquire().await?;

        let Some(settlement) =
            SettlementRepository::find_by_id_for_company(&mut *conn, company_id, settlement_id).await?
        else {
            debug!("회사 {} 정산 {} 없음, 빈 결과 반환", company_id, settlement_id);
            return Ok(Vec::new());
        };

        let rows = SettlementOrderRepository::read_frozen_rows(&mut *conn, settlement.id).await?;
        let mut views: Vec<SettlementOrderView> = rows
            .into_iter()
            .map(|row| frozen_view(row, &settlement))
            .collect();

        let overlay = PromotionOverlay::load(
            &mut *conn,
            settlement.mall_id,
            views.iter().filter_map(|v| v.mapping_code.as_deref()),
            today,
        )
        .await?;
        overlay.apply(&mut views);

        debug!(
            "정산 {} 동결 조회: 주문 {}건, 프로모션 {}건 적용 대상",
            settlement.id,
            views.len(),
            overlay.len()
        );

        Ok(views)
    }

    /// 실시간 조회. 정산/연결 상태와 무관하게 원천 주문과 카탈로그로 다시 계산한다.
    pub async fn read_live(
        &self,
        company_id: i64,
        mall_id: i64,
        period: SettlementPeriod,
        today: NaiveDate,
    ) -> SettlementResult<Vec<SettlementOrderView>> {
        validate_company(company_id)?;

        let mut conn = self.pool.acquire().await?;

        let orders = load_mall_orders(&mut *conn, company_id, mall_id, &period).await?;
        let mut views: Vec<SettlementOrderView> = orders.iter().map(SettlementOrderView::from).collect();

        let overlay = PromotionOverlay::load(
            &mut *conn,
            mall_id,
            views.iter().filter_map(|v| v.mapping_code.as_deref()),
            today,
        )
        .await?;
        overlay.apply(&mut views);

        debug!(
            "몰 {} 실시간 조회 {} ~ {}: 주문 {}건",
            mall_id,
            period.start,
            period.end,
            views.len()
        );

        Ok(views)
    }
}

fn validate_company(company_id: i64) -> SettlementResult<()> {
    if company_id <= 0 {
        return Err(SettlementError::validation("회사 ID가 필요합니다"));
    }
    Ok(())
}

/// 스냅샷 행을 조회 결과로 복원. 스냅샷이 비어 있으면 집계 기본값을 쓴다.
fn frozen_view(row: FrozenOrderRow, settlement: &SettlementRecord) -> SettlementOrderView {
    SettlementOrderView {
        order_id: row.order_id,
        mall_id: row.mall_id.or(Some(settlement.mall_id)),
        shop_name: row.shop_name,
        mapping_code: row.snapshot_mapping_code,
        product_name: row.snapshot_product_name.unwrap_or_default(),
        quantity: row.snapshot_quantity.unwrap_or(DEFAULT_QUANTITY),
        supply_price: row.snapshot_supply_price.unwrap_or(DEFAULT_PRICE),
        cost_price: row.snapshot_cost_price.unwrap_or(DEFAULT_PRICE),
        event_price: None,
        discount_rate: None,
        order_status: row.snapshot_order_status.unwrap_or_default(),
        order_date: row
            .created_at
            .or(row.snapshot_order_date)
            .unwrap_or(settlement.created_at),
    }
}
