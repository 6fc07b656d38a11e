use image::Rgba;

/// Box and chip colour for a class id, following the COCO grouping.
pub fn class_colour(class_id: usize) -> Rgba<u8> {
    match class_id {
        0 => Rgba([128, 0, 128, 255]),     // purple (people)
        1..=8 => Rgba([0, 255, 0, 255]),   // green (vehicles)
        14..=23 => Rgba([255, 0, 0, 255]), // red (animals)
        _ => Rgba([0, 0, 255, 255]),       // blue (everything else)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups() {
        assert_eq!(class_colour(0), Rgba([128, 0, 128, 255]));
        assert_eq!(class_colour(2), class_colour(8));
        assert_eq!(class_colour(16), Rgba([255, 0, 0, 255]));
        assert_eq!(class_colour(9), class_colour(79));
        assert_eq!(class_colour(9), Rgba([0, 0, 255, 255]));
    }
}
