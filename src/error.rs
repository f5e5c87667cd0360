/// 정산 서비스 에러 타입
///
/// `Validation`은 쓰기 전에 거부되므로 부작용이 없습니다.
/// `Store`는 대사 배치 전체를 롤백시키며, 원천 데이터로부터 재계산하므로
/// 그대로 재시도해도 같은 결과에 도달합니다.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("입력 검증 실패: {0}")]
    Validation(String),
    #[error("저장소 오류: {0}")]
    Store(#[from] sqlx::Error),
}

impl SettlementError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// API 응답용 에러 코드
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Store(_) => "STORE_ERROR",
        }
    }
}

pub type SettlementResult<T> = Result<T, SettlementError>;
