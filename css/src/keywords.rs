use super::ColorValue;

pub const BLACK: ColorValue = ColorValue {
    r: 0,
    g: 0,
    b: 0,
    a: 255,
};

pub const WHITE: ColorValue = ColorValue {
    r: 255,
    g: 255,
    b: 255,
    a: 255,
};
