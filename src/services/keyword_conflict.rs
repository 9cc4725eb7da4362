//! Keyword conflict analysis
//!
//! Classifies descriptor keywords onto twelve bipolar axes and flags axes
//! where two profiles land on opposite poles. A keyword matches a pole when
//! it contains one of the pole's terms.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::KeywordConfig;
use crate::models::characteristic::HexagramCharacteristic;
use crate::services::cache::{CacheStats, FifoCache};

/// Fixed semantic axes, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordAxis {
    EmotionalValence,
    RelationalHarmony,
    Abundance,
    Growth,
    Virtue,
    Vitality,
    Dynamism,
    Activity,
    Order,
    Expansion,
    Capability,
    Lifecycle,
}

impl KeywordAxis {
    pub const ALL: [KeywordAxis; 12] = [
        KeywordAxis::EmotionalValence,
        KeywordAxis::RelationalHarmony,
        KeywordAxis::Abundance,
        KeywordAxis::Growth,
        KeywordAxis::Virtue,
        KeywordAxis::Vitality,
        KeywordAxis::Dynamism,
        KeywordAxis::Activity,
        KeywordAxis::Order,
        KeywordAxis::Expansion,
        KeywordAxis::Capability,
        KeywordAxis::Lifecycle,
    ];

    pub fn key(self) -> &'static str {
        match self {
            KeywordAxis::EmotionalValence => "emotional_valence",
            KeywordAxis::RelationalHarmony => "relational_harmony",
            KeywordAxis::Abundance => "abundance",
            KeywordAxis::Growth => "growth",
            KeywordAxis::Virtue => "virtue",
            KeywordAxis::Vitality => "vitality",
            KeywordAxis::Dynamism => "dynamism",
            KeywordAxis::Activity => "activity",
            KeywordAxis::Order => "order",
            KeywordAxis::Expansion => "expansion",
            KeywordAxis::Capability => "capability",
            KeywordAxis::Lifecycle => "lifecycle",
        }
    }

    /// Terms of the positive pole (joy, harmony, abundance, ...)
    pub fn positive_terms(self) -> &'static [&'static str] {
        match self {
            KeywordAxis::EmotionalValence => &[
                "喜び", "楽しみ", "楽観", "希望", "情熱", "充実", "優雅", "栄光", "刺激", "歓喜",
            ],
            KeywordAxis::RelationalHarmony => &[
                "信頼", "出会い", "包容", "婚姻", "家族", "結合", "親しみ", "共鳴", "協力", "調和",
            ],
            KeywordAxis::Abundance => &[
                "供給", "利益", "豊かさ", "繁栄", "豊富", "増進", "成功", "蓄え", "源泉", "恵み",
            ],
            KeywordAxis::Growth => &[
                "成長", "発展", "向上", "進歩", "発達", "上昇", "昇進", "啓発", "学習", "開花",
            ],
            KeywordAxis::Virtue => &[
                "品格", "尊敬", "礼儀", "美徳", "正道", "誠実", "謙遜", "真心", "公明正大", "正義",
            ],
            KeywordAxis::Vitality => &[
                "回復", "栄養", "養育", "復活", "活気", "活力", "威力", "強大", "勇猛", "生命力",
            ],
            KeywordAxis::Dynamism => &[
                "改革", "再生", "刷新", "革命", "変革", "転換", "変化", "維新", "革新", "解放",
            ],
            KeywordAxis::Activity => &[
                "始動", "決断", "処断", "衝撃", "突破", "積極性", "行動", "攻撃", "主導", "推進",
            ],
            KeywordAxis::Order => &[
                "秩序", "統合", "制度", "規範", "組織", "統治", "統率", "規律", "確立", "整然",
            ],
            KeywordAxis::Expansion => &[
                "拡大", "拡散", "散開", "分散", "旅行", "移動", "接近", "浸透", "外向", "照明",
            ],
            KeywordAxis::Capability => &[
                "創造力", "リーダーシップ", "影響力", "克服", "解決", "実力", "才能", "指導",
                "自立", "専門性",
            ],
            KeywordAxis::Lifecycle => &[
                "始まり", "創始", "誕生", "萌芽", "創業", "出発", "開始", "発端", "芽生え", "黎明",
            ],
        }
    }

    /// Terms of the negative pole (difficulty, tension, scarcity, ...)
    pub fn negative_terms(self) -> &'static [&'static str] {
        match self {
            KeywordAxis::EmotionalValence => &[
                "困難", "暗黒", "動揺", "不和", "反目", "矛盾", "窮地", "危険", "極限", "憂い",
            ],
            KeywordAxis::RelationalHarmony => &[
                "対立", "争議", "断絶", "分離", "疎外", "誤解", "孤立", "裏切り", "訴訟", "背反",
            ],
            KeywordAxis::Abundance => &[
                "困窮", "減少", "削減", "制約", "限界", "欠乏", "損失", "不足", "貧困", "枯渇",
            ],
            KeywordAxis::Growth => &[
                "停滞", "閉塞", "足踏み", "行き詰まり", "膠着", "沈滞", "硬直", "遅滞", "頓挫",
                "鈍化",
            ],
            KeywordAxis::Virtue => &[
                "腐敗", "傲慢", "虚栄", "欺瞞", "貪欲", "怠惰", "不正", "堕落", "邪道", "放縦",
            ],
            KeywordAxis::Vitality => &[
                "衰退", "剥落", "侵食", "疲労", "消耗", "衰弱", "虚脱", "倦怠", "憔悴", "疲弊",
            ],
            KeywordAxis::Dynamism => &[
                "蓄積", "貯蔵", "持続", "継続", "不変", "永続", "安定", "恒常", "不動", "維持",
            ],
            KeywordAxis::Activity => &[
                "待機", "忍耐", "準備", "慎重", "漸進", "段階的", "着実", "穏健", "静観", "受動",
            ],
            KeywordAxis::Order => &[
                "混乱", "動乱", "障害", "過度", "重荷", "紛糾", "錯綜", "騒乱", "崩壊", "無法",
            ],
            KeywordAxis::Expansion => &[
                "退避", "戦略的撤退", "保身", "低姿勢", "収束", "縮小", "内向", "隠遁", "潜伏",
                "撤退",
            ],
            KeywordAxis::Capability => &[
                "無力", "未熟", "脆弱", "依存", "弱さ", "迷い", "欠点", "不器用", "非力",
                "頼りなさ",
            ],
            KeywordAxis::Lifecycle => &[
                "終わり", "完結", "終結", "結末", "終焉", "完了", "締めくくり", "晩年", "収穫",
                "閉幕",
            ],
        }
    }

    /// Which poles a keyword set touches on this axis
    pub fn classify<S: AsRef<str>>(self, keywords: &[S]) -> Polarity {
        let hits = |terms: &[&str]| {
            keywords
                .iter()
                .any(|k| terms.iter().any(|t| k.as_ref().contains(t)))
        };
        Polarity::from_matches(hits(self.positive_terms()), hits(self.negative_terms()))
    }
}

impl std::fmt::Display for KeywordAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Pole membership of a keyword set on one axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Positive,
    Negative,
    /// Both poles matched
    Mixed,
    Neutral,
}

impl Polarity {
    fn from_matches(positive: bool, negative: bool) -> Self {
        match (positive, negative) {
            (true, true) => Polarity::Mixed,
            (true, false) => Polarity::Positive,
            (false, true) => Polarity::Negative,
            (false, false) => Polarity::Neutral,
        }
    }

    pub fn is_positive(self) -> bool {
        matches!(self, Polarity::Positive | Polarity::Mixed)
    }

    pub fn is_negative(self) -> bool {
        matches!(self, Polarity::Negative | Polarity::Mixed)
    }

    /// One side positive while the other is negative
    pub fn opposes(self, other: Polarity) -> bool {
        (self.is_positive() && other.is_negative()) || (self.is_negative() && other.is_positive())
    }
}

/// Legacy four-theme tension grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensionTheme {
    Speed,
    Value,
    Time,
    Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TensionSummary {
    pub speed: bool,
    pub value: bool,
    pub time: bool,
    pub direction: bool,
}

/// Per-axis conflict flags, always holding all twelve axes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictMap(BTreeMap<KeywordAxis, bool>);

impl Default for ConflictMap {
    fn default() -> Self {
        Self(KeywordAxis::ALL.into_iter().map(|a| (a, false)).collect())
    }
}

impl ConflictMap {
    pub fn get(&self, axis: KeywordAxis) -> bool {
        self.0.get(&axis).copied().unwrap_or(false)
    }

    /// Entries in axis order
    pub fn iter(&self) -> impl Iterator<Item = (KeywordAxis, bool)> + '_ {
        self.0.iter().map(|(&a, &c)| (a, c))
    }

    pub fn conflicting_axes(&self) -> Vec<KeywordAxis> {
        self.iter().filter(|&(_, c)| c).map(|(a, _)| a).collect()
    }

    pub fn count(&self) -> usize {
        self.0.values().filter(|&&c| c).count()
    }

    pub fn tension_summary(&self) -> TensionSummary {
        TensionSummary {
            speed: self.get(KeywordAxis::Activity),
            value: self.get(KeywordAxis::RelationalHarmony) || self.get(KeywordAxis::Capability),
            time: self.get(KeywordAxis::Dynamism) || self.get(KeywordAxis::Lifecycle),
            direction: self.get(KeywordAxis::Expansion),
        }
    }

    /// First active theme in speed, value, time, direction order
    pub fn dominant_tension(&self) -> Option<TensionTheme> {
        let summary = self.tension_summary();
        [
            (summary.speed, TensionTheme::Speed),
            (summary.value, TensionTheme::Value),
            (summary.time, TensionTheme::Time),
            (summary.direction, TensionTheme::Direction),
        ]
        .into_iter()
        .find(|&(active, _)| active)
        .map(|(_, theme)| theme)
    }
}

/// Per-axis polarity of one keyword set
pub type AxisProfile = BTreeMap<KeywordAxis, Polarity>;

/// Classify keywords on every axis
pub fn classify_keywords<S: AsRef<str>>(keywords: &[S]) -> AxisProfile {
    KeywordAxis::ALL
        .into_iter()
        .map(|axis| (axis, axis.classify(keywords)))
        .collect()
}

/// Conflict map between two keyword sets, uncached
pub fn compare_keywords<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> ConflictMap {
    if a.is_empty() || b.is_empty() {
        return ConflictMap::default();
    }
    ConflictMap(
        KeywordAxis::ALL
            .into_iter()
            .map(|axis| (axis, axis.classify(a).opposes(axis.classify(b))))
            .collect(),
    )
}

/// Memoizing conflict analyzer
///
/// Results are keyed by the `(a.name, b.name)` pair, so names must identify
/// characteristics uniquely.
#[derive(Debug)]
pub struct KeywordConflictAnalyzer {
    cache: FifoCache<(String, String), ConflictMap>,
}

impl Default for KeywordConflictAnalyzer {
    fn default() -> Self {
        Self::new(&KeywordConfig::default())
    }
}

impl KeywordConflictAnalyzer {
    pub fn new(config: &KeywordConfig) -> Self {
        Self {
            cache: FifoCache::new(config.cache_capacity),
        }
    }

    pub fn analyze_keyword_combination(
        &mut self,
        a: &HexagramCharacteristic,
        b: &HexagramCharacteristic,
    ) -> ConflictMap {
        let key = (a.name.clone(), b.name.clone());
        if let Some(hit) = self.cache.get(&key) {
            debug!(a = %a.name, b = %b.name, "keyword conflict cache hit");
            return hit;
        }

        let map = compare_keywords(&a.keywords, &b.keywords);
        debug!(
            a = %a.name,
            b = %b.name,
            conflicts = map.count(),
            "keyword conflicts computed"
        );
        self.cache.insert(key, map.clone());
        map
    }

    pub fn classify_keywords(&self, characteristic: &HexagramCharacteristic) -> AxisProfile {
        classify_keywords(&characteristic.keywords)
    }

    pub fn count_conflicts(&self, map: &ConflictMap) -> usize {
        map.count()
    }

    /// Keys of the conflicting axes, in axis order
    pub fn identify_main_conflicts(&self, map: &ConflictMap) -> Vec<&'static str> {
        map.conflicting_axes().into_iter().map(KeywordAxis::key).collect()
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
