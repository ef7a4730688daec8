//! Prompt building for the support persona.

use supportdesk_core::message::{Exchange, Message, MessageToolCall};
use supportdesk_core::tool::ToolInvocation;

const PERSONA: &str = "\
Anda adalah Chatbot Customer Support untuk sebuah toko online sederhana.

TUJUAN:
- Menjawab pertanyaan pengguna dengan jelas, ringkas, dan membantu
- Memanggil tools bila diperlukan untuk mendapatkan informasi akurat
- Mengingat {window} interaksi terakhir dalam sesi ini

INTENTS YANG DIDUKUNG:
1. Status pesanan: pengguna menyebutkan ID pesanan (get_order_status)
2. Informasi produk: pengguna menanyakan fitur atau spesifikasi produk (get_product_info)
3. Prosedur garansi: pengguna menanyakan klaim garansi (get_warranty_policy)

ATURAN PENTING:
- Jika hasil tool sudah diberikan, jawab HANYA berdasarkan hasil tersebut
- Jangan mengarang status pesanan, harga, atau stok
- Jika informasi tidak lengkap, ajukan pertanyaan klarifikasi singkat
- Batasi respons maksimal {max_words} kata
- SELALU akhiri dengan ringkasan satu kalimat diawali \"{prefix} ...\"

GAYA KOMUNIKASI:
- Ramah, profesional, dalam Bahasa Indonesia
- Gunakan penomoran jika ada langkah-langkah";

const EMPTY_MEMORY: &str = "Tidak ada riwayat percakapan sebelumnya.";

const FALLBACK_BODY: &str = "\
Maaf, saya adalah chatbot customer support yang khusus membantu dengan:

1. **Status Pesanan** - Cek pesanan dengan menyebutkan ID pesanan
2. **Informasi Produk** - Tanyakan spesifikasi atau fitur produk tertentu
3. **Klaim Garansi** - Prosedur dan syarat klaim garansi

Contoh pertanyaan yang bisa saya bantu:
- \"Di mana pesanan saya? ID: ORD123\"
- \"Apa kelebihan laptop gaming Y?\"
- \"Bagaimana cara klaim garansi?\"

Silakan ajukan pertanyaan sesuai kategori di atas, atau hubungi customer service di 0800-1234-5678 untuk bantuan lainnya.";

const FALLBACK_SUMMARY: &str = "Saya membantu status pesanan, info produk, dan klaim garansi, silakan tanyakan sesuai kategori tersebut.";

/// Reply used when the model returns nothing and no tool ran.
pub fn fallback_reply() -> (&'static str, &'static str) {
    (FALLBACK_BODY, FALLBACK_SUMMARY)
}

/// The persona and rules, with the memory window appended.
pub fn system_prompt(window: &[Exchange], window_size: usize, max_words: usize, summary_prefix: &str) -> String {
    let persona = PERSONA
        .replace("{window}", &window_size.to_string())
        .replace("{max_words}", &max_words.to_string())
        .replace("{prefix}", summary_prefix);

    format!("{persona}\n\nMEMORI KONTEKS:\n{}", render_memory(window))
}

/// Render exchanges as `Pengguna:` / `Asisten:` lines, oldest first.
pub fn render_memory(window: &[Exchange]) -> String {
    if window.is_empty() {
        return EMPTY_MEMORY.to_string();
    }

    let mut out = String::from("Riwayat percakapan sebelumnya:");
    for exchange in window {
        out.push_str("\nPengguna: ");
        out.push_str(&exchange.user);
        out.push_str("\nAsisten: ");
        out.push_str(&exchange.assistant);
    }
    out
}

/// Context block carrying a tool outcome into the prompt.
pub fn tool_context(invocation: &ToolInvocation, facts: &str) -> String {
    let status = if invocation.outcome.is_found() { "ditemukan" } else { "tidak tersedia" };
    format!(
        "HASIL TOOL {} ({}) untuk '{}':\n{}",
        invocation.kind.name(),
        status,
        invocation.input,
        facts
    )
}

/// Messages for the first model call of a turn.
pub fn build_messages(system: String, user_message: &str, tool_context: Option<String>) -> Vec<Message> {
    let mut messages = vec![Message::system(system)];
    if let Some(context) = tool_context {
        messages.push(Message::system(context));
    }
    messages.push(Message::user(user_message));
    messages
}

/// Append the model's tool request and its result for a follow-up call.
pub fn append_tool_result(messages: &mut Vec<Message>, call: &MessageToolCall, facts: &str) {
    let mut request = Message::assistant("");
    request.tool_calls.push(call.clone());
    messages.push(request);
    messages.push(Message::tool_result(&call.id, facts));
}

/// First 50 characters, for logs.
pub fn preview(text: &str) -> String {
    let mut out: String = text.chars().take(50).collect();
    if text.chars().count() > 50 {
        out.push_str("...");
    }
    out
}
