//! 游戏王卡片数据
//!
//! 查询结果记录与展示格式

/// 默认卡图地址前缀
pub const DEFAULT_IMAGE_BASE: &str = "https://images.ygoprodeck.com/images/cards";

/// 单张卡片的查询结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRecord {
    pub chinese_name: String,
    pub japanese_name: String,
    pub english_name: String,
    pub id: u64,
    pub type_label: String,
    pub description: String,
}

impl CardRecord {
    /// 卡图地址：`{image_base}/{id}.jpg`
    pub fn image_url(&self, image_base: &str) -> String {
        format!("{}/{}.jpg", image_base.trim_end_matches('/'), self.id)
    }
}

/// 一次查询的结果序列
///
/// 只能遍历一次，不可重启
#[derive(Debug)]
pub struct CardHits {
    inner: std::vec::IntoIter<CardRecord>,
}

impl CardHits {
    pub fn new(records: Vec<CardRecord>) -> Self {
        Self {
            inner: records.into_iter(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl Iterator for CardHits {
    type Item = CardRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for CardHits {}

/// 卡片展示格式化
#[derive(Debug, Clone)]
pub struct CardFormatter {
    image_base: String,
}

impl CardFormatter {
    pub fn new(image_base: impl Into<String>) -> Self {
        Self {
            image_base: image_base.into(),
        }
    }

    /// 把一张卡片渲染成回复文本
    pub fn render(&self, card: &CardRecord) -> String {
        format!(
            "YGO Card Search Result:\n\
             CN Name: {}\n\
             JP Name: {}\n\
             EN Name: {}\n\
             Card ID: {}\n\
             Types: {}\n\
             Description: {}\n\
             Image: {}\n",
            card.chinese_name,
            card.japanese_name,
            card.english_name,
            card.id,
            card.type_label,
            card.description,
            card.image_url(&self.image_base),
        )
    }
}

impl Default for CardFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_BASE)
    }
}
