//! 방 번호 저장소
//!
//! 방 번호(`i16`)로 바로 찾을 수 있는 슬롯 배열과, `(활성 여부, 번호)` 순으로
//! 정렬된 인덱스 최소 힙을 함께 유지합니다. 힙의 맨 위에는 가장 작은 번호의
//! 비활성 슬롯이 올라오므로 새 방은 빈 번호 중 가장 작은 번호를 재사용합니다.

use parking_lot::RwLock;

struct Slot<T> {
    active: bool,
    value: Option<T>,
}

struct StorageInner<T> {
    slots: Vec<Slot<T>>,
    /// 슬롯 인덱스의 최소 힙
    heap: Vec<usize>,
    /// 슬롯 인덱스 → 힙 위치
    positions: Vec<usize>,
}

impl<T> StorageInner<T> {
    fn key(&self, slot: usize) -> (bool, usize) {
        (self.slots[slot].active, slot)
    }

    fn less(&self, a: usize, b: usize) -> bool {
        self.key(self.heap[a]) < self.key(self.heap[b])
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.positions[self.heap[a]] = a;
        self.positions[self.heap[b]] = b;
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.less(pos, parent) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.heap.len();
        loop {
            let left = pos * 2 + 1;
            let right = left + 1;
            let mut smallest = pos;
            if left < len && self.less(left, smallest) {
                smallest = left;
            }
            if right < len && self.less(right, smallest) {
                smallest = right;
            }
            if smallest == pos {
                break;
            }
            self.swap(pos, smallest);
            pos = smallest;
        }
    }

    /// 슬롯의 키가 바뀐 뒤 힙 순서 복구
    fn fix(&mut self, slot: usize) {
        let pos = self.positions[slot];
        self.sift_up(pos);
        self.sift_down(self.positions[slot]);
    }

    fn push(&mut self, slot: usize) {
        self.positions.push(self.heap.len());
        self.heap.push(slot);
        self.sift_up(self.heap.len() - 1);
    }

    /// 마지막 슬롯을 힙과 배열에서 제거
    fn pop_last_slot(&mut self) {
        let slot = self.slots.len() - 1;
        let pos = self.positions[slot];
        let last = self.heap.len() - 1;
        self.swap(pos, last);
        self.heap.pop();
        self.positions.pop();
        self.slots.pop();
        if pos < self.heap.len() {
            self.sift_up(pos);
            self.sift_down(pos);
        }
    }
}

/// 방 번호 저장소
///
/// 쓰기(방 생성, 갱신, 정리)는 로비 액터만 하고, 읽기는 여러 연결 태스크가
/// 동시에 할 수 있도록 읽기/쓰기 잠금으로 보호합니다.
pub struct RoomStorage<T> {
    inner: RwLock<StorageInner<T>>,
}

impl<T> std::fmt::Debug for RoomStorage<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("RoomStorage")
            .field("slots", &inner.slots.len())
            .field("active", &inner.slots.iter().filter(|s| s.active).count())
            .finish()
    }
}

impl<T: Clone> Default for RoomStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> RoomStorage<T> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StorageInner {
                slots: Vec::new(),
                heap: Vec::new(),
                positions: Vec::new(),
            }),
        }
    }

    /// 새 방 배정
    ///
    /// 가장 작은 번호의 비활성 슬롯을 재사용하고, 없으면 배열 끝에 추가합니다.
    /// `make`는 배정된 번호로 슬롯에 넣을 값을 만듭니다.
    /// `i16` 범위를 넘으면 `None`을 반환합니다.
    pub fn new_room(&self, make: impl FnOnce(i16) -> T) -> Option<(i16, T)> {
        let mut inner = self.inner.write();

        let reuse = inner
            .heap
            .first()
            .copied()
            .filter(|&slot| !inner.slots[slot].active);

        let slot = match reuse {
            Some(slot) => slot,
            None => {
                let slot = inner.slots.len();
                if slot > i16::MAX as usize {
                    return None;
                }
                inner.slots.push(Slot {
                    active: false,
                    value: None,
                });
                inner.push(slot);
                slot
            }
        };

        let number = slot as i16;
        let value = make(number);
        inner.slots[slot] = Slot {
            active: true,
            value: Some(value.clone()),
        };
        inner.fix(slot);
        Some((number, value))
    }

    /// 방 활성 상태 변경 후 힙 순서 복구
    ///
    /// 비활성으로 바꾸면 저장된 값도 버립니다.
    pub fn update_room(&self, number: i16, active: bool) -> bool {
        let mut inner = self.inner.write();
        let slot = match usize::try_from(number) {
            Ok(slot) if slot < inner.slots.len() => slot,
            _ => return false,
        };
        inner.slots[slot].active = active;
        if !active {
            inner.slots[slot].value = None;
        }
        inner.fix(slot);
        true
    }

    /// 방 비활성화
    pub fn remove_room(&self, number: i16) -> bool {
        self.update_room(number, false)
    }

    /// 활성 방 조회
    pub fn get_room(&self, number: i16) -> Option<T> {
        let inner = self.inner.read();
        let slot = usize::try_from(number).ok()?;
        inner
            .slots
            .get(slot)
            .filter(|s| s.active)
            .and_then(|s| s.value.clone())
    }

    /// 배열 끝의 비활성 슬롯 정리
    ///
    /// 정리한 슬롯 수를 반환합니다.
    pub fn cull(&self) -> usize {
        let mut inner = self.inner.write();
        let mut culled = 0;
        while inner.slots.last().map(|s| !s.active).unwrap_or(false) {
            inner.pop_last_slot();
            culled += 1;
        }
        culled
    }

    /// 슬롯 수 (비활성 포함)
    pub fn len(&self) -> usize {
        self.inner.read().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().slots.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.inner.read().slots.iter().filter(|s| s.active).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuses_lowest_inactive_slot() {
        let storage = RoomStorage::new();
        for expected in 0..5 {
            let (number, _) = storage.new_room(|n| n * 10).unwrap();
            assert_eq!(number, expected);
        }

        storage.remove_room(3);
        storage.remove_room(1);
        assert_eq!(storage.new_room(|n| n * 10).unwrap().0, 1);
        assert_eq!(storage.new_room(|n| n * 10).unwrap().0, 3);
        assert_eq!(storage.new_room(|n| n * 10).unwrap().0, 5);
        assert_eq!(storage.get_room(3), Some(30));
    }

    #[test]
    fn test_inactive_rooms_are_hidden() {
        let storage = RoomStorage::new();
        storage.new_room(|_| "a").unwrap();
        storage.new_room(|_| "b").unwrap();
        storage.remove_room(0);

        assert_eq!(storage.get_room(0), None);
        assert_eq!(storage.get_room(1), Some("b"));
        assert_eq!(storage.get_room(-1), None);
        assert_eq!(storage.get_room(99), None);
        assert_eq!(storage.active_count(), 1);
        assert!(!storage.update_room(42, true));
    }

    #[test]
    fn test_cull_trailing_inactive() {
        let storage = RoomStorage::new();
        for _ in 0..4 {
            storage.new_room(|n| n).unwrap();
        }
        storage.remove_room(1);
        storage.remove_room(2);
        storage.remove_room(3);

        assert_eq!(storage.cull(), 3);
        assert_eq!(storage.len(), 1);
        assert_eq!(storage.active_count(), 1);
        assert_eq!(storage.new_room(|n| n).unwrap().0, 1);
    }

    #[test]
    fn test_debug_summary() {
        let storage = RoomStorage::new();
        storage.new_room(|n| n).unwrap();
        storage.new_room(|n| n).unwrap();
        storage.remove_room(0);
        assert_eq!(format!("{:?}", storage), "RoomStorage { slots: 2, active: 1 }");
    }
}
