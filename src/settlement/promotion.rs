//! 프로모션 오버레이
//!
//! 조회 결과에만 기간 한정 가격을 덧씌운다. 저장된 주문/정산은 건드리지 않는다.
//! 조회 중 만료된 프로모션(`end_date < today`)을 발견하면 그 자리에서 지운다.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use log::{debug, warn};
use sqlx::sqlite::SqliteConnection;

use crate::db::models::PromotionRecord;
use crate::db::repository::PromotionRepository;
use crate::error::SettlementResult;
use crate::settlement::model::SettlementOrderView;

/// 프로모션 유효 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionState {
    /// 아직 시작 전
    Pending,
    Active,
    Expired,
}

impl PromotionState {
    /// `[start_date, end_date]` 양끝 포함
    pub fn of(promotion: &PromotionRecord, today: NaiveDate) -> Self {
        if promotion.end_date < today {
            Self::Expired
        } else if promotion.start_date > today {
            Self::Pending
        } else {
            Self::Active
        }
    }
}

/// 유효한 프로모션의 가격 규칙
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PromotionRule {
    pub event_price: Option<i64>,
    pub discount_rate: Option<f64>,
}

impl PromotionRule {
    pub fn from_record(promotion: &PromotionRecord) -> Self {
        Self {
            event_price: promotion.event_price,
            discount_rate: promotion.discount_rate,
        }
    }

    /// 행사가가 있으면 그대로 쓰고, 없으면 할인율(%)을 적용해 반올림한다.
    pub fn apply(&self, price: i64) -> i64 {
        if let Some(event_price) = self.event_price {
            return event_price;
        }
        match self.discount_rate {
            Some(rate) => {
                let rate = rate.clamp(0.0, 100.0);
                (price as f64 * (100.0 - rate) / 100.0).round() as i64
            }
            None => price,
        }
    }
}

/// 한 몰의 조회 시점 프로모션 규칙 모음
#[derive(Debug, Clone, Default)]
pub struct PromotionOverlay {
    rules: HashMap<String, PromotionRule>,
}

impl PromotionOverlay {
    /// 상품코드별 프로모션 조회. 만료분은 삭제하고, 시작 전이거나 없는 코드는 건너뛴다.
    pub async fn load<'a, I>(
        conn: &mut SqliteConnection,
        mall_id: i64,
        codes: I,
        today: NaiveDate,
    ) -> SettlementResult<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let codes: BTreeSet<&str> = codes.into_iter().collect();
        let mut rules = HashMap::new();

        for code in codes {
            let Some(promotion) = PromotionRepository::find(&mut *conn, mall_id, code).await? else {
                continue;
            };

            match PromotionState::of(&promotion, today) {
                PromotionState::Active => {
                    rules.insert(code.to_string(), PromotionRule::from_record(&promotion));
                }
                PromotionState::Expired => {
                    // 동시 조회가 같은 행을 먼저 지웠을 수 있다
                    match PromotionRepository::delete(&mut *conn, promotion.id).await {
                        Ok(deleted) => debug!(
                            "만료 프로모션 정리: 몰 {} 상품 {} (종료일 {}, 삭제 {}건)",
                            mall_id, code, promotion.end_date, deleted
                        ),
                        Err(e) => warn!("만료 프로모션 {} 삭제 실패: {}", promotion.id, e),
                    }
                }
                PromotionState::Pending => {}
            }
        }

        Ok(Self { rules })
    }

    pub fn from_rules(rules: HashMap<String, PromotionRule>) -> Self {
        Self { rules }
    }

    pub fn rule_for(&self, code: Option<&str>) -> Option<&PromotionRule> {
        code.and_then(|code| self.rules.get(code))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// 매핑코드 기준으로 반환용 사본의 공급가를 덮어쓴다
    pub fn apply(&self, views: &mut [SettlementOrderView]) {
        for view in views.iter_mut() {
            if let Some(rule) = self.rule_for(view.mapping_code.as_deref()) {
                view.supply_price = rule.apply(view.supply_price);
                view.event_price = rule.event_price;
                view.discount_rate = rule.discount_rate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn promotion(start: &str, end: &str) -> PromotionRecord {
        PromotionRecord {
            id: 1,
            mall_id: 1,
            product_code: "P-1".into(),
            discount_rate: Some(10.0),
            event_price: None,
            start_date: date(start),
            end_date: date(end),
        }
    }

    #[test]
    fn test_validity_window_is_inclusive() {
        let p = promotion("2024-01-10", "2024-01-20");
        assert_eq!(PromotionState::of(&p, date("2024-01-09")), PromotionState::Pending);
        assert_eq!(PromotionState::of(&p, date("2024-01-10")), PromotionState::Active);
        assert_eq!(PromotionState::of(&p, date("2024-01-20")), PromotionState::Active);
        assert_eq!(PromotionState::of(&p, date("2024-01-21")), PromotionState::Expired);
    }

    #[test]
    fn test_event_price_takes_precedence_over_discount() {
        let rule = PromotionRule {
            event_price: Some(700),
            discount_rate: Some(50.0),
        };
        assert_eq!(rule.apply(1000), 700);
    }

    #[test]
    fn test_discount_rate_rounds() {
        let rule = PromotionRule {
            event_price: None,
            discount_rate: Some(15.0),
        };
        assert_eq!(rule.apply(1000), 850);
        assert_eq!(rule.apply(999), 849);
    }

    #[test]
    fn test_rule_without_values_keeps_price() {
        let rule = PromotionRule {
            event_price: None,
            discount_rate: None,
        };
        assert_eq!(rule.apply(1234), 1234);
    }

    #[test]
    fn test_overlay_only_touches_matching_codes() {
        let mut rules = HashMap::new();
        rules.insert(
            "P-1".to_string(),
            PromotionRule {
                event_price: None,
                discount_rate: Some(10.0),
            },
        );
        let overlay = PromotionOverlay::from_rules(rules);

        let view = |code: Option<&str>| SettlementOrderView {
            order_id: 1,
            mall_id: Some(1),
            shop_name: None,
            mapping_code: code.map(str::to_string),
            product_name: String::new(),
            quantity: 1,
            supply_price: 2000,
            cost_price: 0,
            event_price: None,
            discount_rate: None,
            order_status: "결제완료".into(),
            order_date: date("2024-01-01").and_hms_opt(0, 0, 0).unwrap(),
        };
        let mut views = vec![view(Some("P-1")), view(Some("P-2")), view(None)];

        overlay.apply(&mut views);

        assert_eq!(views[0].supply_price, 1800);
        assert_eq!(views[0].discount_rate, Some(10.0));
        assert_eq!(views[1].supply_price, 2000);
        assert_eq!(views[2].supply_price, 2000);
        assert_eq!(views[2].discount_rate, None);
    }
}
