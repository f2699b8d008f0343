//! External column-name boundary
//!
//! The relational schema addresses slots by zero-padded column names
//! (`price07`, `minHour03`). In core everything is a fixed-size array
//! indexed by integer; this module converts at the boundary and nowhere
//! else. Hours are 0-23, days of month 1-31.

use std::fmt;

/// One slot-addressed column of the external schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// Hourly row: lowest unit price of an hour
    HourPrice(u8),
    /// Hourly row: summed quantity of an hour
    HourQuantity(u8),
    /// Monthly row: lowest price of a day
    DayMin(u8),
    /// Monthly row: hour of the day's minimum
    DayMinHour(u8),
    /// Monthly row: decaying average price of a day
    DayAvg(u8),
    /// Monthly row: highest price of a day
    DayMax(u8),
    /// Monthly row: lowest quantity of a day
    DayMinQuantity(u8),
    /// Monthly row: decaying average quantity of a day
    DayAvgQuantity(u8),
    /// Monthly row: highest quantity of a day
    DayMaxQuantity(u8),
}

impl Column {
    /// Parse an external column name. Returns `None` for names outside the
    /// slot-addressed set or with an out-of-range index.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let (prefix, index) = split_trailing_index(name)?;
        let column = match prefix {
            "price" => Self::HourPrice(index),
            "quantity" => Self::HourQuantity(index),
            "min" => Self::DayMin(index),
            "minHour" => Self::DayMinHour(index),
            "avg" => Self::DayAvg(index),
            "max" => Self::DayMax(index),
            "minQuantity" => Self::DayMinQuantity(index),
            "avgQuantity" => Self::DayAvgQuantity(index),
            "maxQuantity" => Self::DayMaxQuantity(index),
            _ => return None,
        };
        column.is_in_range().then_some(column)
    }

    /// The slot index the column addresses
    #[must_use]
    pub const fn index(&self) -> u8 {
        match self {
            Self::HourPrice(index)
            | Self::HourQuantity(index)
            | Self::DayMin(index)
            | Self::DayMinHour(index)
            | Self::DayAvg(index)
            | Self::DayMax(index)
            | Self::DayMinQuantity(index)
            | Self::DayAvgQuantity(index)
            | Self::DayMaxQuantity(index) => *index,
        }
    }

    /// Whether this addresses an hourly-row column
    #[must_use]
    pub const fn is_hourly(&self) -> bool {
        matches!(self, Self::HourPrice(_) | Self::HourQuantity(_))
    }

    const fn is_in_range(&self) -> bool {
        let index = self.index();
        if self.is_hourly() {
            index <= 23
        } else {
            index >= 1 && index <= 31
        }
    }

    const fn prefix(&self) -> &'static str {
        match self {
            Self::HourPrice(_) => "price",
            Self::HourQuantity(_) => "quantity",
            Self::DayMin(_) => "min",
            Self::DayMinHour(_) => "minHour",
            Self::DayAvg(_) => "avg",
            Self::DayMax(_) => "max",
            Self::DayMinQuantity(_) => "minQuantity",
            Self::DayAvgQuantity(_) => "avgQuantity",
            Self::DayMaxQuantity(_) => "maxQuantity",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.prefix(), self.index())
    }
}

fn split_trailing_index(name: &str) -> Option<(&str, u8)> {
    // Last two characters are the zero-padded index
    if name.len() < 3 || !name.is_char_boundary(name.len() - 2) {
        return None;
    }
    let (prefix, digits) = name.split_at(name.len() - 2);
    let index = digits.parse::<u8>().ok()?;
    Some((prefix, index))
}

/// `price{hour:02}` for an hourly upsert
#[must_use]
pub fn hour_price(hour: u8) -> String {
    Column::HourPrice(hour).to_string()
}

/// `quantity{hour:02}` for an hourly upsert
#[must_use]
pub fn hour_quantity(hour: u8) -> String {
    Column::HourQuantity(hour).to_string()
}

/// The seven column names a daily upsert touches for one day of month
#[must_use]
pub fn day_columns(day_of_month: u8) -> [String; 7] {
    [
        Column::DayMin(day_of_month).to_string(),
        Column::DayMinHour(day_of_month).to_string(),
        Column::DayAvg(day_of_month).to_string(),
        Column::DayMax(day_of_month).to_string(),
        Column::DayMinQuantity(day_of_month).to_string(),
        Column::DayAvgQuantity(day_of_month).to_string(),
        Column::DayMaxQuantity(day_of_month).to_string(),
    ]
}
