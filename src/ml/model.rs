// ============================================================
// Layer 5 — UNet11 Segmentation Model
// ============================================================
// VGG11-shaped encoder, transposed-convolution decoder with skip
// connections, one logit per pixel.
//
//   x [N,3,H,W]
//     conv1  (w)    ────────────────────────────────┐
//     pool → conv2 (2w) ──────────────────────────┐ │
//     pool → conv3s, conv3 (4w) ────────────────┐ │ │
//     pool → conv4s, conv4 (8w) ──────────────┐ │ │ │
//     pool → conv5s, conv5 (8w) ────────────┐ │ │ │ │
//     pool → center                         │ │ │ │ │
//     dec5(cat center, conv5) ◄─────────────┘ │ │ │ │
//     dec4(cat dec5, conv4)   ◄───────────────┘ │ │ │
//     dec3(cat dec4, conv3)   ◄─────────────────┘ │ │
//     dec2(cat dec3, conv2)   ◄───────────────────┘ │
//     dec1(cat dec2, conv1)   ◄─────────────────────┘
//     final 1x1 conv → logits [N,1,H,W]
//
// Five 2x poolings: H and W must be multiples of 32, which the
// loader's reflect padding guarantees.
//
// Reference: Burn Book §3 (Building Blocks)
//            Iglovikov & Shvets (2018) TernausNet

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        PaddingConfig2d,
    },
    prelude::*,
    tensor::{activation::relu, module::max_pool2d},
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct UNet11Config {
    /// Channels of the first encoder stage; VGG11 uses 64.
    #[config(default = 64)]
    pub encoder_width: usize,
    /// Base decoder width.
    #[config(default = 32)]
    pub num_filters: usize,
}

impl UNet11Config {
    pub fn init<B: Backend>(&self, device: &B::Device) -> UNet11<B> {
        let w  = self.encoder_width;
        let nf = self.num_filters;

        UNet11 {
            conv1:  conv3x3(3, w, device),
            conv2:  conv3x3(w, w * 2, device),
            conv3s: conv3x3(w * 2, w * 4, device),
            conv3:  conv3x3(w * 4, w * 4, device),
            conv4s: conv3x3(w * 4, w * 8, device),
            conv4:  conv3x3(w * 8, w * 8, device),
            conv5s: conv3x3(w * 8, w * 8, device),
            conv5:  conv3x3(w * 8, w * 8, device),

            center: DecoderBlock::new(w * 8, nf * 16, nf * 8, device),
            dec5:   DecoderBlock::new(nf * 8 + w * 8, nf * 16, nf * 8, device),
            dec4:   DecoderBlock::new(nf * 8 + w * 8, nf * 16, nf * 4, device),
            dec3:   DecoderBlock::new(nf * 4 + w * 4, nf * 8, nf * 2, device),
            dec2:   DecoderBlock::new(nf * 2 + w * 2, nf * 4, nf, device),
            dec1:   conv3x3(nf + w, nf, device),
            final_conv: Conv2dConfig::new([nf, 1], [1, 1]).init(device),
        }
    }
}

fn conv3x3<B: Backend>(c_in: usize, c_out: usize, device: &B::Device) -> Conv2d<B> {
    Conv2dConfig::new([c_in, c_out], [3, 3])
        .with_padding(PaddingConfig2d::Explicit(1, 1))
        .init(device)
}

fn pool<B: Backend>(x: Tensor<B, 4>) -> Tensor<B, 4> {
    max_pool2d(x, [2, 2], [2, 2], [0, 0], [1, 1])
}

// ─── DecoderBlock ─────────────────────────────────────────────────────────────
/// conv3x3 + ReLU, then a stride-2 transposed conv that doubles H and W.
#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub conv:   Conv2d<B>,
    pub deconv: ConvTranspose2d<B>,
}

impl<B: Backend> DecoderBlock<B> {
    pub fn new(c_in: usize, c_mid: usize, c_out: usize, device: &B::Device) -> Self {
        Self {
            conv: conv3x3(c_in, c_mid, device),
            deconv: ConvTranspose2dConfig::new([c_mid, c_out], [3, 3])
                .with_stride([2, 2])
                .with_padding([1, 1])
                .with_padding_out([1, 1])
                .init(device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = relu(self.conv.forward(x));
        relu(self.deconv.forward(x))
    }
}

// ─── UNet11 ───────────────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct UNet11<B: Backend> {
    pub conv1:  Conv2d<B>,
    pub conv2:  Conv2d<B>,
    pub conv3s: Conv2d<B>,
    pub conv3:  Conv2d<B>,
    pub conv4s: Conv2d<B>,
    pub conv4:  Conv2d<B>,
    pub conv5s: Conv2d<B>,
    pub conv5:  Conv2d<B>,
    pub center: DecoderBlock<B>,
    pub dec5:   DecoderBlock<B>,
    pub dec4:   DecoderBlock<B>,
    pub dec3:   DecoderBlock<B>,
    pub dec2:   DecoderBlock<B>,
    pub dec1:   Conv2d<B>,
    pub final_conv: Conv2d<B>,
}

impl<B: Backend> UNet11<B> {
    /// images: [N, 3, H, W] → logits: [N, 1, H, W]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let conv1 = relu(self.conv1.forward(images));
        let conv2 = relu(self.conv2.forward(pool(conv1.clone())));
        let conv3 = relu(self.conv3s.forward(pool(conv2.clone())));
        let conv3 = relu(self.conv3.forward(conv3));
        let conv4 = relu(self.conv4s.forward(pool(conv3.clone())));
        let conv4 = relu(self.conv4.forward(conv4));
        let conv5 = relu(self.conv5s.forward(pool(conv4.clone())));
        let conv5 = relu(self.conv5.forward(conv5));

        let center = self.center.forward(pool(conv5.clone()));

        let dec5 = self.dec5.forward(Tensor::cat(vec![center, conv5], 1));
        let dec4 = self.dec4.forward(Tensor::cat(vec![dec5, conv4], 1));
        let dec3 = self.dec3.forward(Tensor::cat(vec![dec4, conv3], 1));
        let dec2 = self.dec2.forward(Tensor::cat(vec![dec3, conv2], 1));
        let dec1 = relu(self.dec1.forward(Tensor::cat(vec![dec2, conv1], 1)));

        self.final_conv.forward(dec1)
    }
}
