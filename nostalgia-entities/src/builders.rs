pub trait Builder {
    type Build;
    fn build() -> Self::Build;
}

pub use self::pin_builder::*;

pub mod pin_builder {

    use super::*;
    use crate::{geo::*, pin::*};

    #[derive(Debug)]
    pub struct PinBuild {
        pin: Pin,
    }

    impl PinBuild {
        pub fn id(mut self, id: u64) -> Self {
            self.pin.id = id.into();
            self
        }
        pub fn pos(mut self, pos: MapPoint) -> Self {
            self.pin.pos = pos;
            self
        }
        pub fn address(mut self, address: &str) -> Self {
            self.pin.address = address.into();
            self
        }
        pub fn current_business(mut self, business: Option<&str>) -> Self {
            self.pin.current_business = business.map(Into::into);
            self
        }
        pub fn current_category(mut self, category: Option<&str>) -> Self {
            self.pin.current_category = category.map(Into::into);
            self
        }
        pub fn finish(self) -> Pin {
            self.pin
        }
    }

    impl Builder for Pin {
        type Build = PinBuild;
        fn build() -> PinBuild {
            PinBuild {
                pin: Pin {
                    id: 0.into(),
                    pos: MapPoint::default(),
                    address: String::new(),
                    current_business: None,
                    current_category: None,
                },
            }
        }
    }
}
