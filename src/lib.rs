//! 몰 정산 서비스
//!
//! 엑셀에서 적재된 몰별 주문으로 기간 정산을 재계산해 저장하고,
//! 정산을 뒷받침하는 주문 목록을 동결/실시간 두 모드로 보여준다.

pub mod api;
pub mod db;
pub mod error;
pub mod server;
pub mod settlement;

pub use error::{SettlementError, SettlementResult};
