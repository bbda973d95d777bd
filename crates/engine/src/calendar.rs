use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use kanshi_core::analysis::error::CalendarError;
use kanshi_core::config::TradingTimeConfig;
use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;
use utoipa::ToSchema;

/// 向后搜索下一个交易日的最大天数
const MAX_LOOKAHEAD_DAYS: i64 = 30;

/// 内置的 2025 年沪深休市日
const BUILTIN_HOLIDAYS: [&str; 22] = [
    "2025-01-01",
    "2025-01-28",
    "2025-01-29",
    "2025-01-30",
    "2025-01-31",
    "2025-02-01",
    "2025-02-02",
    "2025-02-03",
    "2025-04-04",
    "2025-04-05",
    "2025-04-06",
    "2025-05-01",
    "2025-05-02",
    "2025-05-03",
    "2025-06-10",
    "2025-10-01",
    "2025-10-02",
    "2025-10-03",
    "2025-10-04",
    "2025-10-05",
    "2025-10-06",
    "2025-10-07",
];

/// # Summary
/// 单个交易时段，以一天中的分钟数表示。
///
/// # Invariants
/// - 起止边界均为闭区间。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TradingWindow {
    start: u32,
    end: u32,
}

impl TradingWindow {
    /// 解析 `HH:MM-HH:MM` 格式的时段
    fn parse(period: &str) -> Result<Self, CalendarError> {
        let (start, end) = period.split_once('-').ok_or_else(|| {
            CalendarError::Configuration(format!("invalid trading window '{}'", period))
        })?;
        Ok(Self {
            start: parse_minute_of_day(start)?,
            end: parse_minute_of_day(end)?,
        })
    }

    fn contains(&self, minute: u32) -> bool {
        self.start <= minute && minute <= self.end
    }
}

fn parse_minute_of_day(s: &str) -> Result<u32, CalendarError> {
    let time = NaiveTime::parse_from_str(s.trim(), "%H:%M")
        .map_err(|e| CalendarError::Configuration(format!("invalid time '{}': {}", s, e)))?;
    Ok(time.hour() * 60 + time.minute())
}

fn parse_date(s: &str) -> Result<NaiveDate, CalendarError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| CalendarError::Configuration(format!("invalid holiday '{}': {}", s, e)))
}

/// # Summary
/// 交易日历状态快照，供管理接口展示。
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CalendarStatus {
    // 配置时区下的当前时间
    pub current_time: String,
    pub is_trading_day: bool,
    pub is_trading_time: bool,
    pub weekday: String,
    pub timezone: String,
    pub check_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_trading_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_duration: Option<String>,
}

/// # Summary
/// 交易日历，判断任意时刻是否处于交易时段。
///
/// # Invariants
/// - 时区、交易时段与节假日在构造时一次性解析，运行期不可变。
/// - 纯函数：所有判断只依赖传入时间与自身配置。
#[derive(Debug, Clone)]
pub struct TradingCalendar {
    enabled: bool,
    windows: Vec<TradingWindow>,
    timezone: Tz,
    holidays: HashSet<NaiveDate>,
}

impl TradingCalendar {
    /// # Summary
    /// 根据配置构造交易日历。
    ///
    /// # Logic
    /// 1. 解析 IANA 时区名。
    /// 2. 解析每个 `HH:MM-HH:MM` 交易时段。
    /// 3. 合并内置节假日与配置中的额外休市日。
    ///
    /// # Arguments
    /// * `config` - 交易时间配置。
    ///
    /// # Returns
    /// * 时区或时段非法时返回 `CalendarError::Configuration`。
    pub fn new(config: &TradingTimeConfig) -> Result<Self, CalendarError> {
        let timezone: Tz = config.timezone.parse().map_err(|e| {
            CalendarError::Configuration(format!("unknown timezone '{}': {}", config.timezone, e))
        })?;

        let windows = config
            .trading_hours
            .iter()
            .map(|p| TradingWindow::parse(p))
            .collect::<Result<Vec<_>, _>>()?;

        let mut holidays = builtin_holidays();
        for day in &config.holidays {
            holidays.insert(parse_date(day)?);
        }

        Ok(Self {
            enabled: config.enable_check,
            windows,
            timezone,
            holidays,
        })
    }

    /// # Summary
    /// 构造交易日历，配置非法时退化为默认 A 股日历。
    ///
    /// # Logic
    /// 1. 尝试 `new`。
    /// 2. 失败时记录告警并返回 `default_a_share()`。
    pub fn from_config_or_default(config: &TradingTimeConfig) -> Self {
        match Self::new(config) {
            Ok(calendar) => calendar,
            Err(e) => {
                warn!("{}; falling back to default A-share calendar", e);
                Self::default_a_share()
            }
        }
    }

    /// 默认 A 股日历: 09:30-11:30, 13:00-15:00, Asia/Shanghai
    pub fn default_a_share() -> Self {
        Self {
            enabled: true,
            windows: vec![
                TradingWindow { start: 9 * 60 + 30, end: 11 * 60 + 30 },
                TradingWindow { start: 13 * 60, end: 15 * 60 },
            ],
            timezone: chrono_tz::Asia::Shanghai,
            holidays: builtin_holidays(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// 周六、周日及休市日返回 false
    pub fn is_trading_day(&self, t: DateTime<Utc>) -> bool {
        self.is_trading_date(t.with_timezone(&self.timezone).date_naive())
    }

    fn is_trading_date(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// # Summary
    /// 判断是否处于交易时段。
    ///
    /// # Logic
    /// 1. 未启用检查时恒为 true。
    /// 2. 非交易日为 false。
    /// 3. 当前分钟落在任一时段内 (起止均为闭区间) 为 true。
    pub fn is_trading_time(&self, t: DateTime<Utc>) -> bool {
        if !self.enabled {
            return true;
        }
        if !self.is_trading_day(t) {
            return false;
        }
        let minute = self.minute_of_day(t);
        self.windows.iter().any(|w| w.contains(minute))
    }

    /// # Summary
    /// 计算下一个可交易时刻。
    ///
    /// # Logic
    /// 1. 未启用检查或当前即处于交易时段时，直接返回 `t`。
    /// 2. 今天是交易日时，返回第一个开始时间晚于当前分钟的时段起点。
    /// 3. 否则逐日向后查找交易日，返回其第一个时段起点。
    /// 4. 查找超过 30 天仍无结果时返回 `t + 24h`。
    pub fn next_trading_time(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        if !self.enabled || self.is_trading_time(t) {
            return t;
        }

        let local = t.with_timezone(&self.timezone);
        let today = local.date_naive();

        if self.is_trading_date(today) {
            let minute = self.minute_of_day(t);
            let upcoming = self
                .windows
                .iter()
                .find(|w| w.start > minute)
                .and_then(|w| self.at_local(today, w.start));
            if let Some(next) = upcoming {
                return next;
            }
        }

        if let Some(first) = self.windows.first() {
            for offset in 1..=MAX_LOOKAHEAD_DAYS {
                let date = today + Duration::days(offset);
                if self.is_trading_date(date) {
                    if let Some(next) = self.at_local(date, first.start) {
                        return next;
                    }
                }
            }
        }

        t + Duration::hours(24)
    }

    /// # Summary
    /// 生成当前交易日历状态。
    ///
    /// # Logic
    /// 1. 填充当前时间、交易日、交易时段、星期与时区信息。
    /// 2. 不在交易时段时附加下一个交易时间与等待时长。
    pub fn status(&self, t: DateTime<Utc>) -> CalendarStatus {
        let local = t.with_timezone(&self.timezone);
        let is_trading_time = self.is_trading_time(t);

        let (next_trading_time, wait_duration) = if is_trading_time {
            (None, None)
        } else {
            let next = self.next_trading_time(t);
            (
                Some(self.format_local(next)),
                Some(format_duration(next - t)),
            )
        };

        CalendarStatus {
            current_time: local.format("%Y-%m-%d %H:%M:%S").to_string(),
            is_trading_day: self.is_trading_day(t),
            is_trading_time,
            weekday: weekday_name(local.weekday()).to_string(),
            timezone: self.timezone.name().to_string(),
            check_enabled: self.enabled,
            next_trading_time,
            wait_duration,
        }
    }

    /// 以配置时区格式化时间
    pub fn format_local(&self, t: DateTime<Utc>) -> String {
        t.with_timezone(&self.timezone)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }

    fn minute_of_day(&self, t: DateTime<Utc>) -> u32 {
        let local = t.with_timezone(&self.timezone);
        local.hour() * 60 + local.minute()
    }

    fn at_local(&self, date: NaiveDate, minute: u32) -> Option<DateTime<Utc>> {
        let time = NaiveTime::from_hms_opt(minute / 60, minute % 60, 0)?;
        self.timezone
            .from_local_datetime(&date.and_time(time))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

fn builtin_holidays() -> HashSet<NaiveDate> {
    BUILTIN_HOLIDAYS
        .iter()
        .filter_map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .collect()
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// 格式化为 `1h2m3s` 形式的时长
fn format_duration(d: Duration) -> String {
    let total = d.num_seconds().max(0);
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{}h{}m{}s", h, m, s)
    } else if m > 0 {
        format!("{}m{}s", m, s)
    } else {
        format!("{}s", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 以上海时间构造 UTC 时刻
    fn shanghai(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        chrono_tz::Asia::Shanghai
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .single()
            .map(|t| t.with_timezone(&Utc))
            .unwrap()
    }

    fn calendar() -> TradingCalendar {
        TradingCalendar::new(&TradingTimeConfig::default()).unwrap()
    }

    #[test]
    fn test_weekend_is_never_trading_time() {
        let cal = calendar();
        // 2025-03-08 是周六，2025-03-09 是周日
        for hour in 0..24 {
            assert!(!cal.is_trading_time(shanghai(2025, 3, 8, hour, 0)));
            assert!(!cal.is_trading_time(shanghai(2025, 3, 9, hour, 45)));
        }
        assert!(!cal.is_trading_day(shanghai(2025, 3, 8, 10, 0)));
    }

    #[test]
    fn test_disabled_check_always_trading() {
        let config = TradingTimeConfig {
            enable_check: false,
            ..TradingTimeConfig::default()
        };
        let cal = TradingCalendar::new(&config).unwrap();
        assert!(cal.is_trading_time(shanghai(2025, 3, 8, 3, 0)));
        assert!(cal.is_trading_time(shanghai(2025, 10, 1, 10, 0)));
        let t = shanghai(2025, 3, 8, 3, 0);
        assert_eq!(cal.next_trading_time(t), t);
    }

    #[test]
    fn test_window_boundaries_are_inclusive() {
        let cal = calendar();
        // 2025-03-10 周一
        assert!(cal.is_trading_time(shanghai(2025, 3, 10, 9, 30)));
        assert!(cal.is_trading_time(shanghai(2025, 3, 10, 11, 30)));
        assert!(cal.is_trading_time(shanghai(2025, 3, 10, 15, 0)));
        assert!(!cal.is_trading_time(shanghai(2025, 3, 10, 9, 29)));
        assert!(!cal.is_trading_time(shanghai(2025, 3, 10, 12, 0)));
        assert!(!cal.is_trading_time(shanghai(2025, 3, 10, 15, 1)));
    }

    #[test]
    fn test_holiday_is_not_trading_day() {
        let cal = calendar();
        // 2025-10-01 国庆，周三
        assert!(!cal.is_trading_day(shanghai(2025, 10, 1, 10, 0)));

        let config = TradingTimeConfig {
            holidays: vec!["2025-03-10".to_string()],
            ..TradingTimeConfig::default()
        };
        let cal = TradingCalendar::new(&config).unwrap();
        assert!(!cal.is_trading_time(shanghai(2025, 3, 10, 10, 0)));
    }

    #[test]
    fn test_next_trading_time_same_day_window() {
        let cal = calendar();
        let t = shanghai(2025, 3, 10, 12, 58);
        assert_eq!(cal.next_trading_time(t), shanghai(2025, 3, 10, 13, 0));

        let t = shanghai(2025, 3, 10, 9, 28);
        assert_eq!(cal.next_trading_time(t), shanghai(2025, 3, 10, 9, 30));
    }

    #[test]
    fn test_next_trading_time_returns_now_when_trading() {
        let cal = calendar();
        let t = shanghai(2025, 3, 10, 10, 15);
        assert_eq!(cal.next_trading_time(t), t);
    }

    #[test]
    fn test_next_trading_time_skips_weekend_and_holidays() {
        let cal = calendar();
        // 周五收盘后 -> 下周一开盘
        let t = shanghai(2025, 3, 7, 16, 0);
        assert_eq!(cal.next_trading_time(t), shanghai(2025, 3, 10, 9, 30));

        // 国庆长假 -> 10-08 周三开盘
        let t = shanghai(2025, 9, 30, 15, 30);
        assert_eq!(cal.next_trading_time(t), shanghai(2025, 10, 8, 9, 30));
    }

    #[test]
    fn test_next_trading_time_without_windows_falls_back() {
        let config = TradingTimeConfig {
            trading_hours: Vec::new(),
            ..TradingTimeConfig::default()
        };
        let cal = TradingCalendar::new(&config).unwrap();
        let t = shanghai(2025, 3, 10, 10, 0);
        assert_eq!(cal.next_trading_time(t), t + Duration::hours(24));
    }

    #[test]
    fn test_invalid_config_degrades_to_default() {
        let config = TradingTimeConfig {
            enable_check: false,
            timezone: "Mars/Olympus_Mons".to_string(),
            ..TradingTimeConfig::default()
        };
        assert!(matches!(
            TradingCalendar::new(&config),
            Err(CalendarError::Configuration(_))
        ));

        let cal = TradingCalendar::from_config_or_default(&config);
        assert!(cal.is_enabled());
        assert_eq!(cal.timezone(), chrono_tz::Asia::Shanghai);

        let bad_window = TradingTimeConfig {
            trading_hours: vec!["9:30~11:30".to_string()],
            ..TradingTimeConfig::default()
        };
        assert!(TradingCalendar::new(&bad_window).is_err());
    }

    #[test]
    fn test_status_reports_wait_when_closed() {
        let cal = calendar();
        let status = cal.status(shanghai(2025, 3, 10, 12, 58));
        assert!(status.is_trading_day);
        assert!(!status.is_trading_time);
        assert_eq!(status.weekday, "Monday");
        assert_eq!(status.timezone, "Asia/Shanghai");
        assert_eq!(status.next_trading_time.as_deref(), Some("2025-03-10 13:00:00"));
        assert_eq!(status.wait_duration.as_deref(), Some("2m0s"));

        let open = cal.status(shanghai(2025, 3, 10, 10, 0));
        assert!(open.is_trading_time);
        assert!(open.next_trading_time.is_none());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(3723)), "1h2m3s");
        assert_eq!(format_duration(Duration::seconds(59)), "59s");
    }
}
