//! # 최신 요청 우선(latest-wins) 가드
//!
//! 필터를 빠르게 바꾸면 이전 요청의 응답이 나중에 도착해 최신 결과를 덮어쓸 수 있습니다.
//! 요청마다 단조 증가하는 번호를 붙이고, 마지막으로 발급한 번호의 응답만 받아들입니다.
//!
//! 목록 API는 클라이언트가 보낸 `seq`를 그대로 돌려주므로 프론트엔드도 같은 규칙을 씁니다.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// 요청 번호 발급기. 첫 번호는 1입니다.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_latest(&self, seq: u64) -> bool {
        seq == self.latest()
    }
}

/// 한 화면이 들고 있는 마지막 응답
///
/// `accept()`는 응답 번호가 최신 발급 번호일 때만 값을 교체합니다.
#[derive(Debug, Default)]
pub struct ScreenState<T> {
    sequencer: RequestSequencer,
    current: Mutex<Option<(u64, T)>>,
}

impl<T: Clone> ScreenState<T> {
    pub fn new() -> Self {
        Self {
            sequencer: RequestSequencer::new(),
            current: Mutex::new(None),
        }
    }

    /// 새 요청을 시작할 때 호출해 번호를 받습니다.
    pub fn begin(&self) -> u64 {
        self.sequencer.issue()
    }

    /// 응답을 반영했으면 `true`, 오래된 응답이라 버렸으면 `false`
    pub fn accept(&self, seq: u64, value: T) -> bool {
        if !self.sequencer.is_latest(seq) {
            tracing::debug!(seq, latest = self.sequencer.latest(), "discarding stale response");
            return false;
        }
        match self.current.lock() {
            Ok(mut current) => {
                *current = Some((seq, value));
                true
            }
            Err(_) => false,
        }
    }

    pub fn current(&self) -> Option<T> {
        self.current
            .lock()
            .ok()
            .and_then(|current| current.as_ref().map(|(_, value)| value.clone()))
    }
}
