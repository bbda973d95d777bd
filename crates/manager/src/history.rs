/// # Summary
/// 固定容量的分析结果环形缓冲区。
///
/// # Invariants
/// - 内存空间在初始化时一次性分配，后续不再扩容。
/// - 始终保持最近 `capacity` 条结果；容量为 0 时丢弃所有写入。
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    // 内部存储容器
    data: Vec<T>,
    // 最大容量
    capacity: usize,
    // 已满后下一次覆盖的位置
    cursor: usize,
}

impl<T: Clone> HistoryBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            cursor: 0,
        }
    }

    /// # Summary
    /// 写入一条新结果。
    ///
    /// # Logic
    /// 1. 未满时直接追加。
    /// 2. 已满时覆盖 cursor 处最旧的一条，并递增 (取模) cursor。
    pub fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        if self.data.len() < self.capacity {
            self.data.push(item);
        } else {
            self.data[self.cursor] = item;
            self.cursor = (self.cursor + 1) % self.capacity;
        }
    }

    /// 最新写入的一条
    pub fn last(&self) -> Option<T> {
        if self.data.len() < self.capacity {
            return self.data.last().cloned();
        }
        let idx = if self.cursor == 0 {
            self.capacity.checked_sub(1)?
        } else {
            self.cursor - 1
        };
        self.data.get(idx).cloned()
    }

    /// 由新到旧的最近 `limit` 条
    pub fn recent(&self, limit: usize) -> Vec<T> {
        let (newer, older) = self.data.split_at(self.cursor);
        newer
            .iter()
            .rev()
            .chain(older.iter().rev())
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_before_wrap() {
        let mut buf = HistoryBuffer::new(5);
        for i in 1..=3 {
            buf.push(i);
        }
        assert_eq!(buf.recent(10), vec![3, 2, 1]);
        assert_eq!(buf.recent(2), vec![3, 2]);
        assert_eq!(buf.last(), Some(3));
    }

    #[test]
    fn test_overwrites_oldest_after_wrap() {
        let mut buf = HistoryBuffer::new(3);
        for i in 1..=7 {
            buf.push(i);
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.last(), Some(7));
        assert_eq!(buf.recent(10), vec![7, 6, 5]);
    }

    #[test]
    fn test_zero_capacity_drops_everything() {
        let mut buf = HistoryBuffer::new(0);
        buf.push(1);
        assert!(buf.is_empty());
        assert_eq!(buf.last(), None);
        assert!(buf.recent(5).is_empty());
    }
}
