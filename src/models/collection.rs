use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ScrapeError;

/// Root of every collection listing; the token and a trailing slash are appended.
pub const COLLECTIONS_BASE_URL: &str = "https://www.linkedin.com/jobs/collections/";

macro_rules! collections {
    ($($variant:ident => $token:literal,)+) => {
        /// Job board collections (categories/segments) that can be walked.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Collection {
            $($variant,)+
        }

        impl Collection {
            pub const ALL: &'static [Collection] = &[$(Collection::$variant,)+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Collection::$variant => $token,)+
                }
            }
        }
    };
}

collections! {
    // Core collections
    Recommended => "recommended",
    TopApplicant => "top-applicant",
    EasyApply => "easy-apply",
    Hybrid => "hybrid",
    Remote => "remote-jobs",
    PartTime => "part-time-jobs",
    // Industry sectors
    Sustainability => "sustainability",
    Manufacturing => "manufacturing",
    DefenseAndSpace => "defense-and-space",
    SocialImpact => "social-impact",
    Government => "government",
    Pharmaceuticals => "pharmaceuticals",
    Biotechnology => "biotechnology",
    Construction => "construction",
    RealEstate => "real-estate",
    Restaurants => "restaurants",
    Retail => "retail",
    Hospitality => "hospitality",
    FinancialServices => "financial-services",
    TransportationAndLogistics => "transportation-and-logistics",
    HospitalsAndHealthcare => "hospitals-and-healthcare",
    FoodAndBeverages => "food-and-beverages",
    ApparelAndFashion => "apparel-and-fashion",
    Museums => "museums-historical-sites-and-zoos",
    Media => "media",
    Publishing => "publishing",
    DigitalSecurity => "digital-security",
    // Professional fields
    HumanResources => "human-resources",
    StaffingAndRecruiting => "staffing-and-recruiting",
    MarketingAndAdvertising => "marketing-and-advertising",
    CivilEngineering => "civil-eng",
    // Education
    HigherEducation => "higher-edu",
    Education => "education",
    // Other
    SmallBusiness => "small-business",
    Volunteer => "volunteer",
    NonProfits => "non-profits",
    HumanServices => "human-services",
    CareerGrowth => "career-growth",
    WorkLifeBalance => "work-life-balance",
}

impl Collection {
    /// Every accepted token, in declaration order.
    pub fn choices() -> Vec<&'static str> {
        Self::ALL.iter().map(Collection::as_str).collect()
    }

    /// Listing address for this collection.
    pub fn url(&self) -> String {
        format!("{COLLECTIONS_BASE_URL}{}/", self.as_str())
    }
}

impl FromStr for Collection {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| ScrapeError::InvalidCollection(s.to_string()))
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Collection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
