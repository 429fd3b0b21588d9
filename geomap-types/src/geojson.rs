//! Conversion between [`LatLng`] and GeoJSON positions. GeoJSON stores longitude first.

use geojson::Position;

use crate::error::GeomapTypesError;
use crate::geo::LatLng;

impl TryFrom<&Position> for LatLng {
    type Error = GeomapTypesError;

    fn try_from(value: &Position) -> Result<Self, Self::Error> {
        if value.len() < 2 {
            return Err(GeomapTypesError::Conversion(
                "point must contain at least 2 dimensions".to_string(),
            ));
        }

        let point = LatLng::new(value[1], value[0]);
        if !point.is_valid() {
            return Err(GeomapTypesError::Conversion(format!(
                "coordinates out of range: [{}, {}]",
                value[0], value[1]
            )));
        }

        Ok(point)
    }
}

impl From<LatLng> for Position {
    fn from(value: LatLng) -> Self {
        vec![value.lng(), value.lat()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_conversion_error<T>(result: &Result<T, GeomapTypesError>) -> bool {
        matches!(result, Err(GeomapTypesError::Conversion(_)))
    }

    #[test]
    fn position_is_longitude_first() {
        let position: Position = LatLng::new(37.0, 127.0).into();
        assert_eq!(position, vec![127.0, 37.0]);

        let back = LatLng::try_from(&position).expect("valid position");
        assert_eq!(back, LatLng::new(37.0, 127.0));
    }

    #[test]
    fn short_position_is_rejected() {
        assert!(is_conversion_error(&LatLng::try_from(&vec![1.0])));
        assert!(is_conversion_error(&LatLng::try_from(&vec![1.0, 95.0])));
    }
}
