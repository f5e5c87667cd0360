//! 정산 대사기
//!
//! 몰별 판단은 순수 함수 `plan_settlement`가 내리고, 트랜잭션 경계는
//! `SettlementReconciler::reconcile` 하나만 가진다. 회사의 모든 몰을 이름순으로
//! 하나의 트랜잭션 안에서 순차 처리하며, 한 몰이라도 실패하면 배치 전체가 롤백된다.

use chrono::{NaiveDateTime, Utc};
use log::{debug, error, info, warn};
use sqlx::sqlite::{SqliteConnection, SqlitePool};

use crate::db::models::{MallRecord, SettlementOrderRecord, SettlementRecord};
use crate::db::repository::{MallRepository, SettlementOrderRepository, SettlementRepository};
use crate::error::{SettlementError, SettlementResult};
use crate::settlement::aggregator::aggregate_mall;
use crate::settlement::model::{
    MallAggregate, ProcessedMall, ReconcileSummary, SettlementAction, SettlementFigures,
    SettlementKey, SettlementPeriod,
};

/// 몰 하나에 대한 대사 판단
#[derive(Debug, Clone, PartialEq)]
pub enum SettlementPlan {
    /// 빈 기간: 남아있는 정산과 연결 행 삭제
    Delete { settlement_id: i64 },
    /// 빈 기간이고 기존 정산도 없음
    Skip,
    Insert { figures: SettlementFigures },
    Update { settlement_id: i64, figures: SettlementFigures },
    /// 모든 수치가 같음: 정산 행은 쓰지 않지만 연결 행은 새로 쓴다
    Unchanged { settlement_id: i64 },
}

/// 집계 결과와 기존 정산을 비교해 처리 방법 결정
///
/// 수치는 모두 정수 금액/수량(비율은 그로부터 결정적으로 계산)이므로 오차 없이 완전 일치로 비교한다.
pub fn plan_settlement(aggregate: &MallAggregate, existing: Option<&SettlementRecord>) -> SettlementPlan {
    if aggregate.is_empty() {
        return match existing {
            Some(settlement) => SettlementPlan::Delete { settlement_id: settlement.id },
            None => SettlementPlan::Skip,
        };
    }

    let figures = SettlementFigures::from_aggregate(aggregate);

    match existing {
        None => SettlementPlan::Insert { figures },
        Some(settlement) if settlement.figures() == figures => {
            SettlementPlan::Unchanged { settlement_id: settlement.id }
        }
        Some(settlement) => SettlementPlan::Update {
            settlement_id: settlement.id,
            figures,
        },
    }
}

/// 몰 하나의 처리 결과
#[derive(Debug)]
struct MallOutcome {
    plan: SettlementPlan,
    settlement_id: Option<i64>,
    order_count: usize,
}

/// 정산 대사 드라이버
#[derive(Clone)]
pub struct SettlementReconciler {
    pool: SqlitePool,
}

impl SettlementReconciler {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// 회사 전체 몰에 대해 기간 정산을 재계산하고 저장
    ///
    /// 같은 입력으로 다시 실행하면 같은 최종 상태가 되며, 두 번째 실행의
    /// `processed_malls`에는 변경 없는 몰이 빠진다.
    pub async fn reconcile(&self, company_id: i64, period: SettlementPeriod) -> SettlementResult<ReconcileSummary> {
        if company_id <= 0 {
            return Err(SettlementError::validation("회사 ID가 필요합니다"));
        }

        info!(
            "🧮 정산 대사 시작: 회사 {} 기간 {} ~ {}",
            company_id, period.start, period.end
        );

        let mut tx = self.pool.begin().await?;
        let malls = MallRepository::find_by_company(&mut *tx, company_id).await?;
        let now = Utc::now().naive_utc();
        let mut summary = ReconcileSummary::default();

        for mall in &malls {
            let key = SettlementKey {
                company_id,
                mall_id: mall.id,
                period,
            };

            let outcome = match reconcile_mall(&mut *tx, &key, now).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("몰 {}({}) 대사 실패, 배치 전체 롤백: {}", mall.name, mall.id, e);
                    if let Err(rollback_err) = tx.rollback().await {
                        warn!("롤백 실패 (커넥션 반환 시 폐기됨): {}", rollback_err);
                    }
                    return Err(e);
                }
            };

            record_outcome(&mut summary, mall, outcome);
        }

        tx.commit().await?;

        info!(
            "✅ 정산 대사 완료: 몰 {}개, 반영 {} / 변경없음 {} / 삭제 {}, 주문 {}건",
            malls.len(),
            summary.processed_malls.len(),
            summary.unchanged_malls,
            summary.deleted_malls,
            summary.total_orders_processed
        );

        Ok(summary)
    }
}

/// 몰 하나를 집계 → 판단 → 반영. 정산이 남아 있고 주문이 있으면 연결 행을 항상 새로 쓴다.
async fn reconcile_mall(
    conn: &mut SqliteConnection,
    key: &SettlementKey,
    now: NaiveDateTime,
) -> SettlementResult<MallOutcome> {
    let aggregate = aggregate_mall(&mut *conn, key).await?;
    let existing = SettlementRepository::find_by_key(&mut *conn, key).await?;
    let plan = plan_settlement(&aggregate, existing.as_ref());

    debug!("몰 {} 대사 판단: {:?}", key.mall_id, plan);

    let settlement_id = match &plan {
        SettlementPlan::Delete { settlement_id } => {
            SettlementRepository::delete(&mut *conn, *settlement_id).await?;
            None
        }
        SettlementPlan::Skip => None,
        SettlementPlan::Insert { figures } => {
            Some(SettlementRepository::insert(&mut *conn, key, figures, now).await?)
        }
        SettlementPlan::Update { settlement_id, figures } => {
            SettlementRepository::update(&mut *conn, *settlement_id, figures, now).await?;
            Some(*settlement_id)
        }
        SettlementPlan::Unchanged { settlement_id } => Some(*settlement_id),
    };

    if let Some(settlement_id) = settlement_id {
        if !aggregate.orders.is_empty() {
            let links: Vec<SettlementOrderRecord> = aggregate
                .orders
                .iter()
                .map(|order| SettlementOrderRecord::snapshot_of(settlement_id, order))
                .collect();
            let inserted = SettlementOrderRepository::replace_links(&mut *conn, settlement_id, &links).await?;
            debug!("정산 {} 연결 행 {}건 갱신", settlement_id, inserted);
        }
    }

    Ok(MallOutcome {
        plan,
        settlement_id,
        order_count: aggregate.orders.len(),
    })
}

fn record_outcome(summary: &mut ReconcileSummary, mall: &MallRecord, outcome: MallOutcome) {
    summary.total_orders_processed += outcome.order_count;

    let (action, figures) = match outcome.plan {
        SettlementPlan::Insert { figures } => (SettlementAction::Created, figures),
        SettlementPlan::Update { figures, .. } => (SettlementAction::Updated, figures),
        SettlementPlan::Unchanged { .. } => {
            summary.unchanged_malls += 1;
            return;
        }
        SettlementPlan::Delete { .. } => {
            summary.deleted_malls += 1;
            return;
        }
        SettlementPlan::Skip => return,
    };

    if let Some(settlement_id) = outcome.settlement_id {
        summary.processed_malls.push(ProcessedMall {
            mall_id: mall.id,
            mall_name: mall.name.clone(),
            settlement_id,
            action,
            figures,
        });
    }
}
