pub const N_CLASSES: usize = 22;

/// Crop names indexed by class label.
pub static CROP_NAMES: [&str; N_CLASSES] = [
    "apple",
    "banana",
    "blackgram",
    "chickpea",
    "coconut",
    "coffee",
    "cotton",
    "grapes",
    "jute",
    "kidneybeans",
    "lentil",
    "maize",
    "mango",
    "mothbeans",
    "mungbean",
    "muskmelon",
    "orange",
    "papaya",
    "pigeonpeas",
    "pomegranate",
    "rice",
    "watermelon",
];

/// Class label in `0..N_CLASSES`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CropLabel(u8);

impl CropLabel {
    pub fn new(index: usize) -> Option<Self> {
        (index < N_CLASSES).then_some(Self(index as u8))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn name(self) -> &'static str {
        CROP_NAMES[self.index()]
    }
}

impl std::fmt::Display for CropLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
