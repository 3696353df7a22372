//! Health guidance per risk level.

use crate::engine::scale::Level;

/// Two-line guidance: general population first, sensitive groups second.
pub fn advice(level: Level) -> &'static str {
    match level {
        Level::One => "一般人群：可正常活动\n敏感人群：可正常活动",
        Level::Two => "一般人群：可正常活动\n敏感人群：适量减少户外体力消耗和逗留时间",
        Level::Three => {
            "一般人群：适量减少户外体力消耗和逗留时间\n敏感人群：尽可能减少户外体力消耗和逗留时间；尽可能紧闭门窗，开启空气净化器"
        }
        Level::Four => {
            "一般人群：尽可能减少户外体力消耗和逗留时间；尽可能紧闭门窗，开启空气净化器\n敏感人群：避免户外体力消耗和逗留；紧闭门窗，开启空气净化器"
        }
    }
}

/// `None` in, `None` out.
pub fn advice_for(level: Option<Level>) -> Option<&'static str> {
    level.map(advice)
}
