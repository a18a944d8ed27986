/// Default detector model file name looked up in the model cache.
pub const YOLO_MODEL_NAME: &str = "yolov8n.onnx";

/// Focal length of the reference camera, in pixels.
pub const DEFAULT_FOCAL_LENGTH_PX: f64 = 1000.0;

/// Real-world width of the reference object, in centimetres.
pub const DEFAULT_KNOWN_WIDTH_CM: f64 = 7.0;

/// Objects closer than this are reported as not safe.
pub const DEFAULT_SAFE_DISTANCE_CM: f64 = 100.0;

/// Detections below this confidence are ignored.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// Minimum time between two announcements of any kind.
pub const DEFAULT_COOLDOWN_MS: u64 = 2000;

/// Pending announcements beyond this are dropped rather than queued.
pub const ANNOUNCE_QUEUE_CAPACITY: usize = 4;

/// Multipart boundary used for streamed frames.
pub const STREAM_BOUNDARY: &str = "frame";

pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// COCO class names in YOLOv8 output order.
pub const COCO_LABELS: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];
