//! 몰 정산 핵심 로직: 집계, 대사, 연결 원장 갱신, 프로모션 오버레이, 동결/실시간 조회

pub mod aggregator;
pub mod fields;
pub mod model;
pub mod promotion;
pub mod reconciler;
pub mod snapshot;

pub use model::{
    ReconcileSummary, SettlementFigures, SettlementKey, SettlementOrderView, SettlementPeriod,
    CANCELLED_STATUS,
};
pub use promotion::{PromotionOverlay, PromotionRule};
pub use reconciler::{plan_settlement, SettlementPlan, SettlementReconciler};
pub use snapshot::SnapshotReader;
