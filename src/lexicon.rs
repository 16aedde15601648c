//! Curated Turkish word lists shared by every stage.
//!
//! Three separate keyword lists exist on purpose: the categorizer matches on
//! stems, the summarizer counts relevance, and the scorer gates validity on
//! substrings. They overlap but are tuned independently.

use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashSet};

use crate::models::Category;

/* ------------------------------ Categorizer ------------------------------- */

pub static LOVE_KEYWORDS: &[&str] = &[
    "aşk", "sevgi", "sevgili", "partner", "flört", "ilişki", "kalp", "duygular", "itiraf",
    "buluşma", "evlilik", "romantik", "tutku", "şehvet", "çift", "eş", "bekar", "çekim",
    "ayrılık", "birlikte",
];

pub static MONEY_KEYWORDS: &[&str] = &[
    "para", "maddi", "harcama", "birik", "yatır", "kazanç", "kazan", "finans", "finansal", "maaş",
    "bütçe", "gelir", "gider", "borç", "ödeme", "ekonomik", "mali", "hesap", "kredi", "kar",
    "zarar", "ticaret", "alım", "satım", "tasarruf", "ücret", "kariyer", "iş", "proje", "görev",
    "fırsat", "terfi", "yatırım",
];

pub static HEALTH_KEYWORDS: &[&str] = &[
    "sağlık", "hastalık", "egzersiz", "spor", "beslen", "uyku", "stres", "enerji", "yorgunluk",
    "fiziksel", "ruhsal", "zihin", "rahatla", "dinlen", "yorgun", "sağlam", "dinç", "aktivite",
    "hareket", "gevşe", "meditasyon", "nefes", "beden", "vücut", "form", "kondisyon", "ağrı",
    "acı", "doktor", "boyun", "omuz", "bel", "mide", "kas", "eklem", "diz", "zihinsel",
];

/// Nominal suffixes a keyword may carry in running text: plural,
/// possessive, case, a few derivational endings and the copula. `ca`/`ce`
/// and `ki` are left out so `boyunca` and `belki` stay unrelated.
pub static INFLECTION_SUFFIXES: &[&str] = &[
    // plural
    "lar", "ler",
    // possessive
    "m", "ım", "im", "um", "üm", "n", "ın", "in", "un", "ün", "ı", "i", "u", "ü", "sı", "si", "su",
    "sü", "mız", "miz", "muz", "müz", "ımız", "imiz", "umuz", "ümüz", "nız", "niz", "nuz", "nüz",
    "ınız", "iniz", "unuz", "ünüz",
    // case
    "a", "e", "ya", "ye", "na", "ne", "yı", "yi", "yu", "yü", "nı", "ni", "nu", "nü", "da", "de",
    "ta", "te", "nda", "nde", "dan", "den", "tan", "ten", "ndan", "nden", "nın", "nin", "nun",
    "nün", "la", "le", "yla", "yle",
    // derivational
    "lı", "li", "lu", "lü", "sız", "siz", "suz", "süz", "sal", "sel", "ma", "me", "mak", "mek",
    // imperative and copula
    "yın", "yin", "dır", "dir", "dur", "dür", "tır", "tir", "tur", "tür",
];

/// Idioms that stemming would tear apart. A hit assigns the category alone.
pub static LOVE_PHRASES: &[&str] = &[
    "duygusal bağ",
    "duygusal bağlanma",
    "duygusal yakınlık",
    "duygusal destek",
    "duygusal bir konuşma",
    "duygusal bir buluşma",
    "ilişki adımı",
    "ilişkide adım",
];

pub static MONEY_PHRASES: &[&str] = &[
    "ek gelir",
    "ek kazanç",
    "gelir artışı",
    "iş fırsatı",
    "kariyer fırsatı",
    "iş kurmak",
];

pub static HEALTH_PHRASES: &[&str] = &[
    "dikkat et",
    "soğuk algınlığı",
    "baş ağrısı",
    "ruh sağlığı",
    "zihinsel yorgunluk",
    "zihinsel olarak",
    "psikolojik olarak",
    "fiziksel yorgunluk",
];

pub fn categorizer_keywords(cat: Category) -> &'static [&'static str] {
    match cat {
        Category::General => &[],
        Category::Love => LOVE_KEYWORDS,
        Category::Money => MONEY_KEYWORDS,
        Category::Health => HEALTH_KEYWORDS,
    }
}

pub fn categorizer_phrases(cat: Category) -> &'static [&'static str] {
    match cat {
        Category::General => &[],
        Category::Love => LOVE_PHRASES,
        Category::Money => MONEY_PHRASES,
        Category::Health => HEALTH_PHRASES,
    }
}

/* ------------------------------- Summarizer ------------------------------- */

pub fn relevance_keywords(cat: Category) -> &'static [&'static str] {
    match cat {
        Category::General => &[],
        Category::Love => &[
            "aşk", "sevgi", "partner", "flört", "ilişki", "kalp", "duygusal", "evlilik", "romantik",
        ],
        Category::Money => &[
            "para", "maddi", "harcama", "birikim", "yatırım", "kazanç", "finans", "maaş", "gelir",
        ],
        Category::Health => &[
            "sağlık", "enerji", "stres", "egzersiz", "spor", "beslenme", "uyku", "yorgun", "dinlen",
        ],
    }
}

pub fn stopwords() -> &'static HashSet<String> {
    static SET: Lazy<HashSet<String>> = Lazy::new(|| {
        let words = [
            "ve", "bir", "bu", "için", "ile", "daha", "çok", "gibi", "ya", "da", "ancak", "ama",
            "fakat", "veya", "hem", "de", "ki", "olan", "olarak",
        ];
        words.iter().map(|s| s.to_string()).collect()
    });
    &SET
}

/// Sentence-initial connectives that do not survive being lifted out of
/// their paragraph. Matched case-insensitively, optional trailing comma.
pub static DISCOURSE_MARKERS: &[&str] = &[
    "ayrıca",
    "aynı zamanda",
    "bunun yanında",
    "bunun yanı sıra",
    "öte yandan",
    "diğer yandan",
    "bununla birlikte",
    "ancak",
    "fakat",
    "ama",
    "aslında",
    "dahası",
    "hatta",
];

/// Vocative openers some sources start every paragraph with
/// ("Sevgili Koç, ..."). Only stripped when followed by a comma.
pub static VOCATIVE_OPENERS: &[&str] = &["sevgili", "canım", "değerli"];

/// Who a vocative may address besides a sign name ("Sevgili okurlar,").
pub static VOCATIVE_ADDRESSEES: &[&str] = &[
    "okur", "okurlar", "okurum", "okurlarım", "okuyucu", "okuyucular", "okuyucularım", "dostlar",
    "dostum", "arkadaşlar", "arkadaşım", "burç", "burçlar", "burcu",
];

/// Source boilerplate stripped before sentence splitting (regex patterns).
pub static SOURCE_OPENERS: &[&str] = &[
    r"Aygül Aydın.*?burç yorumları;?\s*",
    r"Günlük burç yorumları.*?;\s*",
    r"Burç yorumu.*?:\s*",
    r"Uzman Astrolog\s*",
];

/// Proper nouns that must keep their capital letter after the summarizer
/// lowercases sentence bodies.
pub static PROPER_NOUNS: &[&str] = &[
    "Merkür", "Venüs", "Mars", "Jüpiter", "Satürn", "Uranüs", "Neptün", "Plüton", "Koç", "Boğa",
    "İkizler", "Yengeç", "Başak", "Terazi", "Oğlak",
];

/// Interchangeable vocabulary for optional lexical variation. Every group
/// maps each member to the others.
pub static SYNONYM_GROUPS: &[&[&str]] = &[
    &["harika", "muhteşem", "şahane"],
    &["güzel", "hoş"],
    &["fırsat", "şans"],
    &["önemli", "değerli"],
    &["huzurlu", "rahat"],
    &["dikkatli", "temkinli", "tedbirli"],
    &["zor", "zorlu", "çetin"],
];

pub fn synonyms_of(word: &str) -> Option<Vec<&'static str>> {
    SYNONYM_GROUPS
        .iter()
        .find(|g| g.contains(&word))
        .map(|g| g.iter().copied().filter(|w| *w != word).collect())
}

/* --------------------------------- Scorer --------------------------------- */

/// term -> weight, strongest tier first.
pub static POSITIVE_WORDS: &[(&str, f64)] = &[
    ("harika", 3.0), ("mükemmel", 3.0), ("muhteşem", 3.0), ("olağanüstü", 3.0), ("şahane", 3.0),
    ("enfes", 3.0), ("parlak", 3.0), ("görkemli", 3.0), ("fevkalade", 3.0),
    ("başarılı", 2.5), ("şanslı", 2.5), ("kazanç", 2.5), ("verimli", 2.5),
    ("üretken", 2.5), ("yaratıcı", 2.5), ("ilham verici", 2.5), ("coşkulu", 2.5),
    ("heyecan verici", 2.5), ("tutku", 2.5), ("tutkulu", 2.5), ("romantik", 2.5),
    ("aşk dolu", 2.5), ("sevgi dolu", 2.5), ("enerji dolu", 2.5), ("dinç", 2.5),
    ("mutlu", 2.0), ("iyi", 2.0), ("güzel", 2.0), ("olumlu", 2.0), ("fırsat", 2.0), ("şans", 2.0),
    ("gelişme", 2.0), ("ilerleme", 2.0), ("büyüme", 2.0), ("yükseliş", 2.0), ("kazanım", 2.0),
    ("başarı", 2.0), ("zafer", 2.0), ("galibiyet", 2.0), ("değerli", 2.0), ("önemli", 2.0),
    ("sağlıklı", 2.0), ("güçlü", 2.0), ("kuvvetli", 2.0), ("enerjik", 2.0), ("canlı", 2.0),
    ("neşeli", 2.0), ("keyifli", 2.0), ("hoş", 2.0), ("rahat", 2.0), ("huzurlu", 2.0),
    ("uygun", 1.5), ("elverişli", 1.5), ("destekleyici", 1.5), ("yardımcı", 1.5),
    ("yararlı", 1.5), ("faydalı", 1.5), ("avantajlı", 1.5), ("kazançlı", 1.5),
    ("bereketli", 1.5), ("bol", 1.5), ("zengin", 1.5), ("varlıklı", 1.5),
    ("istikrarlı", 1.5), ("dengeli", 1.5), ("uyumlu", 1.5), ("ahenkli", 1.5),
    ("yeni", 1.0), ("değişim", 1.0), ("farklı", 1.0), ("özel", 1.0), ("anlamlı", 1.0),
    ("dikkat çekici", 1.0), ("ilginç", 1.0), ("cezbedici", 1.0), ("çekici", 1.0),
    ("umut", 1.0), ("umutlu", 1.0), ("iyimser", 1.0), ("pozitif", 1.0), ("açık", 1.0),
];

/// term -> weight (absolute value), strongest tier first.
pub static NEGATIVE_WORDS: &[(&str, f64)] = &[
    ("felaket", 3.0), ("yıkım", 3.0), ("dehşet", 3.0), ("korkunç", 3.0), ("berbat", 3.0),
    ("rezil", 3.0), ("feci", 3.0), ("trajik", 3.0), ("kötü", 3.0),
    ("kayıp", 2.5), ("zarar", 2.5), ("zararlı", 2.5), ("tehlike", 2.5), ("tehlikeli", 2.5),
    ("riskli", 2.5), ("sorun", 2.5), ("sorunlu", 2.5), ("problemli", 2.5),
    ("hastalık", 2.5), ("hasta", 2.5), ("rahatsız", 2.5), ("huzursuz", 2.5),
    ("gergin", 2.5), ("stresli", 2.5), ("kaygılı", 2.5), ("endişeli", 2.5),
    ("zor", 2.0), ("zorlu", 2.0), ("güç", 2.0), ("çetin", 2.0),
    ("yoğun", 2.0), ("baskı", 2.0), ("baskılı", 2.0), ("sıkıntı", 2.0), ("sıkıntılı", 2.0),
    ("mutsuz", 2.0), ("üzgün", 2.0), ("kederli", 2.0), ("hüzünlü", 2.0),
    ("olumsuz", 2.0), ("kötümser", 2.0), ("karamsarlık", 2.0), ("umutsuz", 2.0),
    ("belirsiz", 2.0), ("kararsız", 2.0), ("istikrarsız", 2.0), ("dengesiz", 2.0),
    ("dikkat", 1.5), ("dikkatli", 1.5), ("temkinli", 1.5), ("ihtiyatlı", 1.5),
    ("tedbirli", 1.5), ("sakıncalı", 1.5), ("mahzurlu", 1.5),
    ("zayıf", 1.5), ("güçsüz", 1.5), ("yorgun", 1.5), ("bitkin", 1.5),
    ("düşük", 1.5), ("az", 1.5), ("eksik", 1.5), ("yetersiz", 1.5),
    ("gecikme", 1.0), ("gecikmeli", 1.0), ("yavaş", 1.0), ("ağır", 1.0),
    ("engel", 1.0), ("engelleyici", 1.0), ("zorlayıcı", 1.0), ("kısıtlayıcı", 1.0),
    ("sınırlı", 1.0), ("dar", 1.0), ("kapalı", 1.0), ("karanlık", 1.0),
];

pub struct CategoryLexicon {
    /// Validity gate: at least one must occur for a specific category.
    pub keywords: &'static [&'static str],
    pub positive_boost: &'static [&'static str],
    pub negative_words: &'static [&'static str],
}

pub fn scoring_lexicons() -> &'static BTreeMap<Category, CategoryLexicon> {
    static MAP: Lazy<BTreeMap<Category, CategoryLexicon>> = Lazy::new(|| {
        let mut m = BTreeMap::new();
        m.insert(
            Category::Love,
            CategoryLexicon {
                keywords: &[
                    "aşk", "sevgi", "sevgili", "partner", "eş", "ilişki", "romantik", "romantizm",
                    "flört", "flörtöz", "evlilik", "evli", "nişan", "nişanlı", "tutku", "tutkulu",
                    "duygusal", "duygu", "his", "hissiyat", "çift", "birlikte", "beraberlik",
                    "yakınlık", "yakınlaşma", "sıcaklık", "şefkat", "şefkatli", "özen", "ilgi",
                    "alaka", "bağ", "bağlılık", "sadakat", "vefa", "güven", "ihanet",
                ],
                positive_boost: &[
                    "romantik", "tutkulu", "aşk dolu", "sevgi dolu", "uyumlu", "bağ güçleniyor",
                    "yakınlaşma", "sıcak anlar", "özel anlar", "kalp kalbe", "ruh eşi",
                ],
                negative_words: &[
                    "ihanet", "aldatma", "ayrılık", "kavga", "tartışma", "soğukluk", "mesafe",
                    "güvensizlik", "kıskançlık", "kırılma", "hayal kırıklığı",
                ],
            },
        );
        m.insert(
            Category::Money,
            CategoryLexicon {
                keywords: &[
                    "para", "finans", "finansal", "gelir", "kazanç", "kazanmak", "yatırım",
                    "yatırımcı", "ekonomi", "ekonomik", "bütçe", "harcama", "tasarruf", "maddi",
                    "mali", "iş", "işe", "kariyer", "kariyerde", "maaş", "ücret", "prim",
                    "ikramiye", "proje", "projeler", "girişim", "girişimci", "başarı", "şirket",
                    "firma", "ticaret", "alışveriş", "satış", "satın alma", "borç", "kredi",
                    "servet", "varlık", "zenginlik", "refah", "bolluk", "bereket",
                ],
                positive_boost: &[
                    "finansal fırsat", "kazanç", "gelir artışı", "yatırım fırsatı", "başarı",
                    "terfi", "zam", "prim", "kazançlı", "bereketli", "bol", "zengin",
                ],
                negative_words: &[
                    "kayıp", "zarar", "borç", "kriz", "iflas", "düşüş", "azalma", "eksiklik",
                    "yetersizlik", "yoksulluk", "sıkıntı", "darboğaz",
                ],
            },
        );
        m.insert(
            Category::Health,
            CategoryLexicon {
                keywords: &[
                    "sağlık", "sağlıklı", "enerji", "enerjik", "dinç", "canlı", "zinde",
                    "hastalık", "hasta", "rahatsız", "rahatsızlık", "vücut", "fiziksel", "mental",
                    "ruhsal", "psikolojik", "fitness", "spor", "egzersiz", "hareket", "aktivite",
                    "dinlenme", "istirahat", "uyku", "beslenme", "diyet", "vitamin", "bağışıklık",
                    "direniş", "dayanıklılık", "kondisyon", "form", "denge", "huzur", "sakinlik",
                    "stres", "gerginlik", "yorgunluk", "bitkinlik", "tükenme",
                ],
                positive_boost: &[
                    "enerji dolu", "dinç", "sağlıklı", "zinde", "formda", "güçlü", "dayanıklı",
                    "bağışıklık güçlü", "canlı", "hayat dolu", "dengeli",
                ],
                negative_words: &[
                    "hastalık", "rahatsızlık", "yorgunluk", "bitkinlik", "tükenme", "stres",
                    "gerginlik", "uykusuzluk", "baş ağrısı", "ağrı", "sızı",
                ],
            },
        );
        m
    });
    &MAP
}

/* ------------------------------- Validation ------------------------------- */

/// Phrases that betray filler or placeholder content from a broken scraper.
pub static GENERIC_PATTERNS: &[&str] = &[
    "sakin ve üretken bir gün",
    "iç sesinizi dinleyin",
    "önemli gelişmeler yaşayabilirsiniz",
    "dikkatli olun, planlı hareket",
    "kendinize zaman ayırın",
    "test data",
    "örnek veri",
    "lorem ipsum",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_stay_in_known_tiers() {
        let tiers = [1.0, 1.5, 2.0, 2.5, 3.0];
        for (w, v) in POSITIVE_WORDS.iter().chain(NEGATIVE_WORDS) {
            assert!(tiers.contains(v), "{} has weight {}", w, v);
        }
    }

    #[test]
    fn synonyms_exclude_the_word_itself() {
        let s = synonyms_of("harika").unwrap();
        assert!(!s.contains(&"harika"));
        assert_eq!(s.len(), 2);
        assert!(synonyms_of("masa").is_none());
    }

    #[test]
    fn general_has_no_scoring_lexicon() {
        assert!(scoring_lexicons().get(&Category::General).is_none());
        assert_eq!(scoring_lexicons().len(), 3);
    }
}
