use serde::Deserialize;

/// One property listing as returned by the listings endpoint.
///
/// Every field except `id` may be absent on the wire; absent stays `None`
/// here, never a zero or empty-string placeholder. Display substitutions
/// belong to the presentation layer. Records arrive through
/// `FetchCoordinator` and are never mutated afterwards.
#[derive(Debug, Deserialize)]
pub struct ListingRecord {
    pub id: Option<String>,

    pub price: Option<u64>,
    pub bedrooms: Option<u64>,
    pub bathrooms: Option<u64>,
    #[serde(rename = "numberOfPhotos")]
    pub number_of_photos: Option<u64>,
    #[serde(rename = "squareFeet")]
    pub square_feet: Option<u64>,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    #[serde(rename = "streetNumber")]
    pub street_number: Option<String>,
    #[serde(rename = "streetName")]
    pub street_name: Option<String>,
    pub city: Option<String>,
    #[serde(rename = "stateCode")]
    pub state_code: Option<String>,
    #[serde(rename = "zipCode")]
    pub zip_code: Option<String>,
    pub neighborhood: Option<String>,

    #[serde(rename = "propertyType")]
    pub property_type: Option<String>,
    #[serde(rename = "listingType")]
    pub listing_type: Option<String>,

    pub photos: Option<Vec<String>>,
}

impl ListingRecord {
    /// A listing is only mappable when both coordinates are present.
    pub fn coordinate(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }

    /// The photo shown for this listing: first URL in wire order.
    pub fn primary_photo(&self) -> Option<&str> {
        self.photos.as_ref()?.first().map(String::as_str)
    }
}
